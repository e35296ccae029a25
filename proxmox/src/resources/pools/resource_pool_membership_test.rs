#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::Client;
    use crate::ProxmoxProviderData;
    use mockito::{Matcher, Server};
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::types::{has_errors, ClientCapabilities, Dynamic};

    const POOL_BODY: &str = r#"{"data":{"comment":"lab","members":[
        {"id":"qemu/100","node":"pve1","type":"qemu","vmid":100},
        {"id":"storage/pve1/local","node":"pve1","type":"storage","storage":"local"}
    ]}}"#;

    fn state(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        ))
    }

    fn vm_membership(vm_id: f64) -> DynamicValue {
        state(&[
            ("id", Dynamic::String(format!("tank/vm/{}", vm_id))),
            ("pool_id", Dynamic::String("tank".into())),
            ("type", Dynamic::String("vm".into())),
            ("vm_id", Dynamic::Number(vm_id)),
            ("storage_id", Dynamic::Null),
        ])
    }

    async fn configured(url: &str) -> PoolMembershipResource {
        let mut resource = PoolMembershipResource::new();
        let client = Client::new(url, "test@pam!test=secret", true).unwrap();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(ProxmoxProviderData::new(client));
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;
        resource
    }

    #[test]
    fn ids_parse_into_memberships() {
        assert_eq!(
            membership_from_id("tank/vm/100").unwrap(),
            Membership {
                pool_id: "tank".to_string(),
                member: Member::Vm(100),
            }
        );

        let storage = membership_from_id("tank/storage/local").unwrap();
        assert_eq!(storage.member, Member::Storage("local".to_string()));
        assert_eq!(storage.generate_id(), "tank/storage/local");
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert_eq!(
            parse_membership_id("tank/100").unwrap_err().to_string(),
            r#"invalid pool membership ID format "tank/100", expected: {pool_id}/{type}/{member_id}"#
        );
        assert_eq!(
            membership_from_id("tank/lxc/100").unwrap_err(),
            MembershipError::InvalidType
        );
        assert_eq!(
            membership_from_id("tank/vm/abc").unwrap_err(),
            MembershipError::InvalidVmId("abc".to_string())
        );
    }

    #[test]
    fn vm_id_takes_precedence() {
        let both = state(&[
            ("vm_id", Dynamic::Number(100.0)),
            ("storage_id", Dynamic::String("local".into())),
        ]);
        assert_eq!(deduce_membership_type(&both).unwrap(), MembershipType::Vm);

        let neither = state(&[("vm_id", Dynamic::Null), ("storage_id", Dynamic::Null)]);
        assert!(deduce_membership_type(&neither).is_err());
    }

    #[tokio::test]
    async fn vm_and_storage_conflict() {
        let resource = PoolMembershipResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: resource.type_name().to_string(),
                    config: state(&[
                        ("pool_id", Dynamic::String("tank".into())),
                        ("vm_id", Dynamic::Number(100.0)),
                        ("storage_id", Dynamic::String("local".into())),
                    ]),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert!(has_errors(&response.diagnostics));

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: resource.type_name().to_string(),
                    config: state(&[("pool_id", Dynamic::String("tank".into()))]),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert!(has_errors(&response.diagnostics));
    }

    #[tokio::test]
    async fn create_adds_vm_to_pool() {
        let mut server = Server::new_async().await;
        let update = server
            .mock("PUT", "/api2/json/pools/tank")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("allow-move".into(), "1".into()),
                Matcher::UrlEncoded("vms".into(), "100".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let planned = state(&[
            ("id", Dynamic::Unknown),
            ("pool_id", Dynamic::String("tank".into())),
            ("type", Dynamic::Unknown),
            ("vm_id", Dynamic::Number(100.0)),
            ("storage_id", Dynamic::Null),
        ]);
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        update.assert_async().await;
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "tank/vm/100"
        );
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("type"))
                .unwrap(),
            "vm"
        );
    }

    #[tokio::test]
    async fn read_keeps_present_member_and_drops_absent_one() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/pools/tank")
            .with_status(200)
            .with_body(POOL_BODY)
            .expect(2)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        for (vm_id, present) in [(100.0, true), (101.0, false)] {
            let response = resource
                .read(
                    Context::new(),
                    ReadResourceRequest {
                        type_name: resource.type_name().to_string(),
                        current_state: vm_membership(vm_id),
                        private: vec![],
                        provider_meta: None,
                        client_capabilities: ClientCapabilities::default(),
                        current_identity: None,
                    },
                )
                .await;
            assert!(response.diagnostics.is_empty());
            assert_eq!(response.new_state.is_some(), present);
        }
    }

    #[tokio::test]
    async fn update_is_rejected() {
        let resource = PoolMembershipResource::new();
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: vm_membership(100.0),
                    planned_state: vm_membership(101.0),
                    config: vm_membership(101.0),
                    planned_private: vec![],
                    provider_meta: None,
                    planned_identity: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Update Not Supported");
    }

    #[tokio::test]
    async fn delete_removes_storage_member() {
        let mut server = Server::new_async().await;
        let update = server
            .mock("PUT", "/api2/json/pools/tank")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("delete".into(), "1".into()),
                Matcher::UrlEncoded("storage".into(), "local".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: state(&[
                        ("id", Dynamic::String("tank/storage/local".into())),
                        ("pool_id", Dynamic::String("tank".into())),
                        ("type", Dynamic::String("storage".into())),
                        ("vm_id", Dynamic::Null),
                        ("storage_id", Dynamic::String("local".into())),
                    ]),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        update.assert_async().await;
    }

    #[tokio::test]
    async fn import_rejects_unknown_type() {
        let resource = PoolMembershipResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: resource.type_name().to_string(),
                    id: "tank/lxc/100".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;

        assert!(response.imported_resources.is_empty());
        assert_eq!(
            response.diagnostics[0].detail,
            "failed to parse ID: invalid pool membership type"
        );
    }

    #[tokio::test]
    async fn import_builds_vm_membership() {
        let resource = PoolMembershipResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: resource.type_name().to_string(),
                    id: "tank/vm/100".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;

        let imported = &response.imported_resources[0].state;
        assert_eq!(
            imported.get_number(&AttributePath::new("vm_id")).unwrap(),
            100.0
        );
        assert!(imported.is_attribute_null(&AttributePath::new("storage_id")));
    }
}
