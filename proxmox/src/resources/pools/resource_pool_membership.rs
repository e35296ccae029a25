//! Resource pool membership of a single VM, container or storage
//!
//! The pools API does not tell containers and VMs apart, both are `vm` members.

use crate::api::pools::{Pool, PoolUpdate};
use crate::resources::common::{get_optional_u64, not_configured, provider_data_from};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{validate_config, ConfigValidator, ConflictsWith, ExactlyOneOf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MembershipError {
    #[error("invalid pool membership ID format {0:?}, expected: {{pool_id}}/{{type}}/{{member_id}}")]
    InvalidIdFormat(String),

    #[error("invalid pool membership type")]
    InvalidType,

    #[error("wrong vm_id format: {0}")]
    InvalidVmId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipType {
    Vm,
    Storage,
}

impl MembershipType {
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipType::Vm => "vm",
            MembershipType::Storage => "storage",
        }
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipType {
    type Err = MembershipError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "vm" => Ok(MembershipType::Vm),
            "storage" => Ok(MembershipType::Storage),
            _ => Err(MembershipError::InvalidType),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Vm(u64),
    Storage(String),
}

impl Member {
    pub fn membership_type(&self) -> MembershipType {
        match self {
            Member::Vm(_) => MembershipType::Vm,
            Member::Storage(_) => MembershipType::Storage,
        }
    }

    fn is_in(&self, pool: &Pool) -> bool {
        match self {
            Member::Vm(vm_id) => pool.has_vm(*vm_id),
            Member::Storage(storage_id) => pool.has_storage(storage_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub pool_id: String,
    pub member: Member,
}

impl Membership {
    /// `{pool_id}/{type}/{member_id}`
    pub fn generate_id(&self) -> String {
        let member_id = match &self.member {
            Member::Vm(vm_id) => vm_id.to_string(),
            Member::Storage(storage_id) => storage_id.clone(),
        };
        format!("{}/{}/{}", self.pool_id, self.member.membership_type(), member_id)
    }

    /// Body of the pool update that adds (or with `remove`, drops) this member
    fn pool_update(&self, remove: bool) -> PoolUpdate {
        let mut update = if remove {
            PoolUpdate {
                delete: Some(true.into()),
                ..Default::default()
            }
        } else {
            PoolUpdate {
                allow_move: Some(true.into()),
                ..Default::default()
            }
        };
        match &self.member {
            Member::Vm(vm_id) => update.vms.push(vm_id.to_string()),
            Member::Storage(storage_id) => update.storage.push(storage_id.clone()),
        }
        update
    }

    fn to_state(&self) -> DynamicValue {
        let mut state = crate::resources::common::empty_state();
        let _ = state.set_string(&AttributePath::new("id"), self.generate_id());
        let _ = state.set_string(&AttributePath::new("pool_id"), self.pool_id.clone());
        let _ = state.set_string(
            &AttributePath::new("type"),
            self.member.membership_type().to_string(),
        );
        match &self.member {
            Member::Vm(vm_id) => {
                let _ = state.set_number(&AttributePath::new("vm_id"), *vm_id as f64);
                let _ = state.set_null(&AttributePath::new("storage_id"));
            }
            Member::Storage(storage_id) => {
                let _ = state.set_null(&AttributePath::new("vm_id"));
                let _ = state.set_string(&AttributePath::new("storage_id"), storage_id.clone());
            }
        }
        state
    }
}

/// A set `vm_id` wins over `storage_id`; neither set is an error
pub fn deduce_membership_type(value: &DynamicValue) -> Result<MembershipType, MembershipError> {
    if !value.is_attribute_null(&AttributePath::new("vm_id")) {
        Ok(MembershipType::Vm)
    } else if !value.is_attribute_null(&AttributePath::new("storage_id")) {
        Ok(MembershipType::Storage)
    } else {
        Err(MembershipError::InvalidType)
    }
}

/// Builds the membership described by a plan or state
pub fn membership_from_value(value: &DynamicValue) -> Result<Membership, MembershipError> {
    let pool_id = value
        .get_optional_string(&AttributePath::new("pool_id"))
        .unwrap_or_default();
    let member = match deduce_membership_type(value)? {
        MembershipType::Vm => {
            let vm_id = get_optional_u64(value, "vm_id").ok_or_else(|| {
                MembershipError::InvalidVmId(
                    value
                        .get_optional_number(&AttributePath::new("vm_id"))
                        .map(|n| n.to_string())
                        .unwrap_or_default(),
                )
            })?;
            Member::Vm(vm_id)
        }
        MembershipType::Storage => Member::Storage(
            value
                .get_optional_string(&AttributePath::new("storage_id"))
                .unwrap_or_default(),
        ),
    };
    Ok(Membership { pool_id, member })
}

/// Splits `{pool_id}/{type}/{member_id}` without interpreting the parts
pub fn parse_membership_id(id: &str) -> Result<(&str, &str, &str), MembershipError> {
    let parts: Vec<&str> = id.split('/').collect();
    match parts.as_slice() {
        [pool_id, membership_type, member_id] => Ok((*pool_id, *membership_type, *member_id)),
        _ => Err(MembershipError::InvalidIdFormat(id.to_string())),
    }
}

pub fn membership_from_id(id: &str) -> Result<Membership, MembershipError> {
    let (pool_id, raw_type, member_id) = parse_membership_id(id)?;
    let member = match raw_type.parse::<MembershipType>()? {
        MembershipType::Vm => Member::Vm(
            member_id
                .parse()
                .map_err(|_| MembershipError::InvalidVmId(member_id.to_string()))?,
        ),
        MembershipType::Storage => Member::Storage(member_id.to_string()),
    };
    Ok(Membership {
        pool_id: pool_id.to_string(),
        member,
    })
}

fn membership_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages resource pool memberships for containers, virtual machines and storages")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The membership ID, {pool_id}/{type}/{member_id}")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("type", AttributeType::String)
                .description("Resource pool membership type, vm for VMs and CTs or storage")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("pool_id", AttributeType::String)
                .description("Resource pool id")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("vm_id", AttributeType::Number)
                .description("VM or CT id")
                .optional()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("storage_id", AttributeType::String)
                .description("Storage id")
                .optional()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .build()
}

fn config_validators() -> Vec<Box<dyn ConfigValidator>> {
    vec![
        ConflictsWith::new("vm_id", &["storage_id"]),
        ExactlyOneOf::new(&["vm_id", "storage_id"]),
    ]
}

#[derive(Default)]
pub struct PoolMembershipResource {
    provider_data: Option<crate::ProxmoxProviderData>,
}

impl PoolMembershipResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for PoolMembershipResource {
    fn type_name(&self) -> &str {
        "proxmox_virtual_environment_pool_membership"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: membership_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = membership_schema().validate_config(&request.config);
        diagnostics.extend(validate_config(&config_validators(), &request.config));
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let membership = match membership_from_value(&request.planned_state) {
            Ok(membership) => membership,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![Diagnostic::error(
                        "Cannot determine pool membership type",
                        format!(
                            "Plan does not have enough information to determine pool membership type: {}",
                            e
                        ),
                    )],
                };
            }
        };

        if let Err(e) = provider_data
            .client
            .pools()
            .update(&membership.pool_id, &membership.pool_update(false))
            .await
        {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    format!("Unable to update resource pool '{}'", membership.pool_id),
                    format!("API error: {}", e),
                )],
            };
        }

        CreateResourceResponse {
            new_state: membership.to_state(),
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
                private: request.private,
                deferred: None,
                new_identity: None,
            };
        };

        let membership = match membership_from_value(&request.current_state) {
            Ok(membership) => membership,
            Err(e) => {
                let raw_type = request
                    .current_state
                    .get_optional_string(&AttributePath::new("type"))
                    .unwrap_or_default();
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![Diagnostic::error(
                        format!("Wrong pool membership type '{}' in state", raw_type),
                        e.to_string(),
                    )],
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                };
            }
        };

        let exists = match provider_data.client.pools().get(&membership.pool_id).await {
            Ok(pool) => membership.member.is_in(&pool),
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![Diagnostic::error(
                        format!("Unable to get pool '{}'", membership.pool_id),
                        format!("API error: {}", e),
                    )],
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                };
            }
        };

        if !exists {
            tracing::warn!(
                "Pool membership {} no longer exists, removing from state",
                membership.generate_id()
            );
            return ReadResourceResponse::removed(request.private);
        }

        ReadResourceResponse {
            new_state: Some(membership.to_state()),
            diagnostics: vec![],
            private: request.private,
            deferred: None,
            new_identity: None,
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.prior_state,
            private: vec![],
            diagnostics: vec![Diagnostic::error(
                "Update Not Supported",
                "All attributes require replacement. This resource cannot be updated in-place",
            )],
            new_identity: None,
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let membership = match membership_from_value(&request.prior_state) {
            Ok(membership) => membership,
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Cannot delete pool membership",
                        e.to_string(),
                    )],
                };
            }
        };

        let diagnostics = match provider_data
            .client
            .pools()
            .update(&membership.pool_id, &membership.pool_update(true))
            .await
        {
            Ok(()) => vec![],
            Err(e) if e.is_not_found() => {
                tracing::warn!("Pool {} already deleted", membership.pool_id);
                vec![]
            }
            Err(e) => vec![Diagnostic::error(
                format!("Unable to update pool '{}'", membership.pool_id),
                format!("API error: {}", e),
            )],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for PoolMembershipResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let (provider_data, diagnostics) = provider_data_from(request.provider_data);
        self.provider_data = provider_data;
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for PoolMembershipResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut planned = membership_schema().plan_changes(
            &request.config,
            &request.prior_state,
            &request.proposed_new_state,
        );

        let known = !planned.planned_state.is_null()
            && ["pool_id", "vm_id", "storage_id"]
                .iter()
                .all(|attr| !request.config.is_attribute_unknown(&AttributePath::new(attr)));
        if known {
            if let Ok(membership) = membership_from_value(&request.config) {
                let _ = planned
                    .planned_state
                    .set_string(&AttributePath::new("id"), membership.generate_id());
                let _ = planned.planned_state.set_string(
                    &AttributePath::new("type"),
                    membership.member.membership_type().to_string(),
                );
            }
        }

        ModifyPlanResponse {
            planned_state: planned.planned_state,
            requires_replace: planned.requires_replace,
            planned_private: request.prior_private,
            diagnostics: planned.diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for PoolMembershipResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        match membership_from_id(&request.id) {
            Ok(membership) => ImportResourceStateResponse {
                imported_resources: vec![ImportedResource {
                    type_name: request.type_name,
                    state: membership.to_state(),
                    private: vec![],
                    identity: request.identity,
                }],
                diagnostics: vec![],
                deferred: None,
            },
            Err(e) => ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Unable to import pool membership",
                    format!("failed to parse ID: {}", e),
                )],
                deferred: None,
            },
        }
    }
}

#[cfg(test)]
#[path = "resource_pool_membership_test.rs"]
mod resource_pool_membership_test;
