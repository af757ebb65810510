use quota_core::ObjectRef;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Canonical JSON of a dimension map (§6, §8 property 8): keys are sorted
/// (guaranteed by `BTreeMap`'s iteration order) and the encoding is
/// otherwise fixed, so two maps equal as sets of pairs always hash
/// identically regardless of construction order.
pub fn canonical_json(dimensions: &BTreeMap<String, String>) -> String {
    let mut out = String::from("{");
    for (index, (key, value)) in dimensions.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&serde_json::to_string(key).expect("string keys always serialize"));
        out.push(':');
        out.push_str(&serde_json::to_string(value).expect("string values always serialize"));
    }
    out.push('}');
    out
}

/// `bucketName(namespace, resourceType, dimensions)` (§6, bit-exact):
/// `"bucket-" || first 12 hex chars of SHA-256(namespace || resourceType || canonicalJSON(dimensions))`.
pub fn bucket_name(namespace: &str, resource_type: &str, dimensions: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(resource_type.as_bytes());
    hasher.update(canonical_json(dimensions).as_bytes());
    let digest = hasher.finalize();
    format!("bucket-{}", &hex::encode(digest)[..12])
}

/// `summaryName(namespace, resourceType, consumerRef)` (§6, bit-exact):
/// `"rqs-" || first 8 hex chars of SHA-256(namespace || resourceType || consumerRef.kind || consumerRef.name)`.
pub fn summary_name(namespace: &str, resource_type: &str, consumer_ref: &ObjectRef) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(resource_type.as_bytes());
    hasher.update(consumer_ref.kind.as_bytes());
    hasher.update(consumer_ref.name.as_bytes());
    let digest = hasher.finalize();
    format!("rqs-{}", &hex::encode(digest)[..8])
}

/// Derives a bucket's namespace from the consumer's identity (§6
/// `bucketNamespace(consumerRef)`). The spec only requires determinism and
/// injectivity over live consumers and leaves the concrete mapping to the
/// collaborator embedding this core; this default concatenates the
/// consumer's kind and name, which is injective as long as no two
/// `consumerRef`s with different `(apiGroup, kind, name)` are meant to
/// collide by design.
pub trait BucketNamespaceResolver: Send + Sync {
    fn bucket_namespace(&self, consumer_ref: &ObjectRef) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBucketNamespaceResolver;

impl BucketNamespaceResolver for DefaultBucketNamespaceResolver {
    fn bucket_namespace(&self, consumer_ref: &ObjectRef) -> String {
        format!("{}-{}", consumer_ref.kind.to_lowercase(), consumer_ref.name)
    }
}
