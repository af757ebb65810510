//! Compiles policy templates once (at Ready time) and renders them many
//! times, once per matching trigger event (§4.K steps 1-2).

use quota_core::model::{
    Allowance, AllowanceTemplate, BucketAllowance, BucketAllowanceTemplate, ClaimCreationPolicySpec,
    GrantCreationPolicySpec, ObjectMetaTemplate, ObjectRefTemplate, PolicyTrigger, RequestTemplate, ResourceClaimSpec,
    ResourceGrantSpec, ResourceRequest, CLAIM_POLICY_VARS, GRANT_POLICY_VARS,
};
use quota_core::{GroupKind, LabelSelector, ObjectRef};
use quota_expr::{compile_bool, compile_string, Compiled, Context};
use quota_template::{split, CompiledField, FieldGrammar, Segment};
use std::collections::BTreeMap;
use thiserror::Error;

/// An annotation recording which policy auto-created an object, so the
/// lifecycle controller can find its children (§4.K step 3).
pub const CREATED_BY_POLICY_ANNOTATION: &str = "quota.example.com/created-by-policy";
/// Annotations recording the trigger object an auto-created object descends
/// from, consulted by the ownership cascade (§4.K lifecycle).
pub const TRIGGER_NAMESPACE_ANNOTATION: &str = "quota.example.com/trigger-namespace";
pub const TRIGGER_NAME_ANNOTATION: &str = "quota.example.com/trigger-name";

#[derive(Debug, Error)]
pub enum PolicyCompileError {
    #[error(transparent)]
    Split(#[from] quota_template::SplitError),
    #[error(transparent)]
    Template(#[from] quota_template::TemplateError),
    #[error(transparent)]
    Expr(#[from] quota_expr::CompileError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Template(#[from] quota_template::RenderError),
    #[error(transparent)]
    Eval(#[from] quota_expr::EvalError),
}

/// The rendered `name`/`generateName`/`namespace`/labels/annotations of a
/// materialized object, with the ownership annotations already injected.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMeta {
    pub name: Option<String>,
    pub generate_name: Option<String>,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// How a rendered target should be materialized (§4.K step 2, §5 "AlreadyExists is success").
#[derive(Debug, Clone, PartialEq)]
pub enum Materialization<T> {
    CreateIfAbsent { name: String, namespace: String, value: T },
    AlwaysCreate { generate_name: String, namespace: String, value: T },
}

/// A field with no fixed grammar (label/annotation/dimension values):
/// every embedded expression compiles and type-checks as a string, but the
/// rendered value is never shape-constrained the way a name is.
#[derive(Debug, Clone)]
struct OpenField {
    parts: Vec<OpenPart>,
}

#[derive(Debug, Clone)]
enum OpenPart {
    Literal(String),
    Expr(Compiled),
}

impl OpenField {
    fn compile(raw: &str, allowed_vars: &[&str]) -> Result<Self, PolicyCompileError> {
        let segments = split(raw)?;
        let mut parts = Vec::with_capacity(segments.len());
        for seg in segments {
            match seg {
                Segment::Literal(s) => parts.push(OpenPart::Literal(s)),
                Segment::Expr(src) => parts.push(OpenPart::Expr(compile_string(&src, allowed_vars)?)),
            }
        }
        Ok(Self { parts })
    }

    fn render(&self, ctx: &Context) -> Result<String, RenderError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                OpenPart::Literal(s) => out.push_str(s),
                OpenPart::Expr(e) => out.push_str(&e.eval_string(ctx)?),
            }
        }
        Ok(out)
    }
}

struct CompiledObjectMeta {
    name: Option<CompiledField>,
    generate_name: Option<CompiledField>,
    namespace: CompiledField,
    labels: BTreeMap<String, OpenField>,
    annotations: BTreeMap<String, OpenField>,
}

impl CompiledObjectMeta {
    fn compile(meta: &ObjectMetaTemplate, allowed_vars: &[&str]) -> Result<Self, PolicyCompileError> {
        let name = meta
            .name
            .as_deref()
            .map(|n| CompiledField::compile(n, FieldGrammar::Dns1123Subdomain, allowed_vars))
            .transpose()?;
        let generate_name = meta
            .generate_name
            .as_deref()
            .map(|n| CompiledField::compile(n, FieldGrammar::GenerateNamePrefix, allowed_vars))
            .transpose()?;
        let namespace = CompiledField::compile(&meta.namespace, FieldGrammar::Dns1123Label, allowed_vars)?;
        let labels = meta
            .labels
            .iter()
            .map(|(k, v)| Ok((k.clone(), OpenField::compile(v, allowed_vars)?)))
            .collect::<Result<_, PolicyCompileError>>()?;
        let annotations = meta
            .annotations
            .iter()
            .map(|(k, v)| Ok((k.clone(), OpenField::compile(v, allowed_vars)?)))
            .collect::<Result<_, PolicyCompileError>>()?;
        Ok(Self {
            name,
            generate_name,
            namespace,
            labels,
            annotations,
        })
    }

    fn render(
        &self,
        ctx: &Context,
        policy_namespace: &str,
        policy_name: &str,
        trigger_namespace: &str,
        trigger_name: &str,
    ) -> Result<RenderedMeta, RenderError> {
        let name = self.name.as_ref().map(|f| f.render(ctx)).transpose()?;
        let generate_name = self.generate_name.as_ref().map(|f| f.render(ctx)).transpose()?;
        let namespace = self.namespace.render(ctx)?;
        let mut labels = BTreeMap::new();
        for (k, v) in &self.labels {
            labels.insert(k.clone(), v.render(ctx)?);
        }
        let mut annotations = BTreeMap::new();
        for (k, v) in &self.annotations {
            annotations.insert(k.clone(), v.render(ctx)?);
        }
        annotations.insert(
            CREATED_BY_POLICY_ANNOTATION.to_string(),
            format!("{policy_namespace}/{policy_name}"),
        );
        annotations.insert(TRIGGER_NAMESPACE_ANNOTATION.to_string(), trigger_namespace.to_string());
        annotations.insert(TRIGGER_NAME_ANNOTATION.to_string(), trigger_name.to_string());

        Ok(RenderedMeta {
            name,
            generate_name,
            namespace,
            labels,
            annotations,
        })
    }
}

fn compile_ref_name(ref_template: &ObjectRefTemplate, allowed_vars: &[&str]) -> Result<CompiledField, PolicyCompileError> {
    Ok(CompiledField::compile(&ref_template.name, FieldGrammar::Dns1123Subdomain, allowed_vars)?)
}

fn render_ref(api_group: &str, kind: &str, compiled_name: &CompiledField, ctx: &Context) -> Result<ObjectRef, RenderError> {
    Ok(ObjectRef {
        api_group: api_group.to_string(),
        kind: kind.to_string(),
        name: compiled_name.render(ctx)?,
    })
}

struct CompiledRequest {
    resource_type: String,
    amount: i64,
    dimensions: BTreeMap<String, OpenField>,
}

impl CompiledRequest {
    fn compile(t: &RequestTemplate, allowed_vars: &[&str]) -> Result<Self, PolicyCompileError> {
        let dimensions = t
            .dimensions
            .iter()
            .map(|(k, v)| Ok((k.clone(), OpenField::compile(v, allowed_vars)?)))
            .collect::<Result<_, PolicyCompileError>>()?;
        Ok(Self {
            resource_type: t.resource_type.clone(),
            amount: t.amount,
            dimensions,
        })
    }

    fn render(&self, ctx: &Context) -> Result<ResourceRequest, RenderError> {
        let mut dimensions = BTreeMap::new();
        for (k, v) in &self.dimensions {
            dimensions.insert(k.clone(), v.render(ctx)?);
        }
        Ok(ResourceRequest {
            resource_type: self.resource_type.clone(),
            amount: self.amount,
            dimensions,
        })
    }
}

struct CompiledBucket {
    amount: i64,
    dimension_selector: BTreeMap<String, OpenField>,
}

impl CompiledBucket {
    fn compile(b: &BucketAllowanceTemplate, allowed_vars: &[&str]) -> Result<Self, PolicyCompileError> {
        let dimension_selector = b
            .dimension_selector
            .iter()
            .map(|(k, v)| Ok((k.clone(), OpenField::compile(v, allowed_vars)?)))
            .collect::<Result<_, PolicyCompileError>>()?;
        Ok(Self {
            amount: b.amount,
            dimension_selector,
        })
    }

    fn render(&self, ctx: &Context) -> Result<BucketAllowance, RenderError> {
        let mut match_labels = BTreeMap::new();
        for (k, v) in &self.dimension_selector {
            match_labels.insert(k.clone(), v.render(ctx)?);
        }
        Ok(BucketAllowance {
            amount: self.amount,
            dimension_selector: LabelSelector { match_labels },
        })
    }
}

struct CompiledAllowance {
    resource_type: String,
    buckets: Vec<CompiledBucket>,
}

impl CompiledAllowance {
    fn compile(a: &AllowanceTemplate, allowed_vars: &[&str]) -> Result<Self, PolicyCompileError> {
        Ok(Self {
            resource_type: a.resource_type.clone(),
            buckets: a.buckets.iter().map(|b| CompiledBucket::compile(b, allowed_vars)).collect::<Result<_, _>>()?,
        })
    }

    fn render(&self, ctx: &Context) -> Result<Allowance, RenderError> {
        Ok(Allowance {
            resource_type: self.resource_type.clone(),
            buckets: self.buckets.iter().map(|b| b.render(ctx)).collect::<Result<_, _>>()?,
        })
    }
}

/// A compiled `ClaimCreationPolicy`: conditions and the claim template,
/// ready to be matched and rendered against many trigger events.
pub struct CompiledClaimPolicy {
    pub trigger: PolicyTrigger,
    conditions: Vec<Compiled>,
    meta: CompiledObjectMeta,
    consumer_ref_api_group: String,
    consumer_ref_kind: String,
    consumer_ref_name: CompiledField,
    resource_ref_api_group: String,
    resource_ref_kind: String,
    resource_ref_name: CompiledField,
    requests: Vec<CompiledRequest>,
}

impl CompiledClaimPolicy {
    pub fn compile(spec: &ClaimCreationPolicySpec) -> Result<Self, PolicyCompileError> {
        let conditions = spec
            .trigger
            .conditions
            .iter()
            .map(|c| Ok(compile_bool(c, CLAIM_POLICY_VARS)?))
            .collect::<Result<_, PolicyCompileError>>()?;
        Ok(Self {
            trigger: spec.trigger.clone(),
            conditions,
            meta: CompiledObjectMeta::compile(&spec.target.metadata, CLAIM_POLICY_VARS)?,
            consumer_ref_api_group: spec.target.consumer_ref.api_group.clone(),
            consumer_ref_kind: spec.target.consumer_ref.kind.clone(),
            consumer_ref_name: compile_ref_name(&spec.target.consumer_ref, CLAIM_POLICY_VARS)?,
            resource_ref_api_group: spec.target.resource_ref.api_group.clone(),
            resource_ref_kind: spec.target.resource_ref.kind.clone(),
            resource_ref_name: compile_ref_name(&spec.target.resource_ref, CLAIM_POLICY_VARS)?,
            requests: spec
                .target
                .requests
                .iter()
                .map(|r| CompiledRequest::compile(r, CLAIM_POLICY_VARS))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn trigger_kind(&self) -> GroupKind {
        GroupKind::new(self.trigger.api_group.clone(), self.trigger.kind.clone())
    }

    pub fn matches(&self, ctx: &Context) -> Result<bool, RenderError> {
        for c in &self.conditions {
            if !c.eval_bool(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn render(
        &self,
        ctx: &Context,
        policy_namespace: &str,
        policy_name: &str,
        trigger_namespace: &str,
        trigger_name: &str,
    ) -> Result<Materialization<ResourceClaimSpec>, RenderError> {
        let meta = self.meta.render(ctx, policy_namespace, policy_name, trigger_namespace, trigger_name)?;
        let consumer_ref = render_ref(&self.consumer_ref_api_group, &self.consumer_ref_kind, &self.consumer_ref_name, ctx)?;
        let resource_ref = render_ref(&self.resource_ref_api_group, &self.resource_ref_kind, &self.resource_ref_name, ctx)?;
        let requests = self.requests.iter().map(|r| r.render(ctx)).collect::<Result<_, _>>()?;
        let spec = ResourceClaimSpec {
            consumer_ref,
            resource_ref,
            requests,
        };
        Ok(materialize(meta, spec))
    }
}

/// A compiled `GrantCreationPolicy`, mirroring [`CompiledClaimPolicy`].
pub struct CompiledGrantPolicy {
    pub trigger: PolicyTrigger,
    conditions: Vec<Compiled>,
    meta: CompiledObjectMeta,
    consumer_ref_api_group: String,
    consumer_ref_kind: String,
    consumer_ref_name: CompiledField,
    allowances: Vec<CompiledAllowance>,
}

impl CompiledGrantPolicy {
    pub fn compile(spec: &GrantCreationPolicySpec) -> Result<Self, PolicyCompileError> {
        let conditions = spec
            .trigger
            .conditions
            .iter()
            .map(|c| Ok(compile_bool(c, GRANT_POLICY_VARS)?))
            .collect::<Result<_, PolicyCompileError>>()?;
        Ok(Self {
            trigger: spec.trigger.clone(),
            conditions,
            meta: CompiledObjectMeta::compile(&spec.target.metadata, GRANT_POLICY_VARS)?,
            consumer_ref_api_group: spec.target.consumer_ref.api_group.clone(),
            consumer_ref_kind: spec.target.consumer_ref.kind.clone(),
            consumer_ref_name: compile_ref_name(&spec.target.consumer_ref, GRANT_POLICY_VARS)?,
            allowances: spec
                .target
                .allowances
                .iter()
                .map(|a| CompiledAllowance::compile(a, GRANT_POLICY_VARS))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn trigger_kind(&self) -> GroupKind {
        GroupKind::new(self.trigger.api_group.clone(), self.trigger.kind.clone())
    }

    pub fn matches(&self, ctx: &Context) -> Result<bool, RenderError> {
        for c in &self.conditions {
            if !c.eval_bool(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn render(
        &self,
        ctx: &Context,
        policy_namespace: &str,
        policy_name: &str,
        trigger_namespace: &str,
        trigger_name: &str,
    ) -> Result<Materialization<ResourceGrantSpec>, RenderError> {
        let meta = self.meta.render(ctx, policy_namespace, policy_name, trigger_namespace, trigger_name)?;
        let consumer_ref = render_ref(&self.consumer_ref_api_group, &self.consumer_ref_kind, &self.consumer_ref_name, ctx)?;
        let allowances = self.allowances.iter().map(|a| a.render(ctx)).collect::<Result<_, _>>()?;
        let spec = ResourceGrantSpec { consumer_ref, allowances };
        Ok(materialize(meta, spec))
    }
}

fn materialize<T>(meta: RenderedMeta, value: T) -> Materialization<T> {
    match (meta.name, meta.generate_name) {
        (Some(name), _) => Materialization::CreateIfAbsent {
            name,
            namespace: meta.namespace,
            value,
        },
        (None, Some(generate_name)) => Materialization::AlwaysCreate {
            generate_name,
            namespace: meta.namespace,
            value,
        },
        (None, None) => unreachable!("validated templates always carry exactly one of name/generateName"),
    }
}
