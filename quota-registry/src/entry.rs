use quota_core::GroupKind;

/// The part of an Active `ResourceRegistration` the cache needs to answer
/// lookups: which registration owns this `resourceType`, what consumes its
/// quota, and who may claim it. `registration_name` lets a registration
/// distinguish its own prior entry from a genuine conflict with another
/// registration (§3 "resourceType globally unique across all
/// registrations", §4.D).
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationEntry {
    pub registration_name: String,
    pub consumer_type: GroupKind,
    pub claiming_resources: Vec<GroupKind>,
}

impl RegistrationEntry {
    pub fn allows_claimer(&self, claimer: &GroupKind) -> bool {
        self.claiming_resources.contains(claimer)
    }
}
