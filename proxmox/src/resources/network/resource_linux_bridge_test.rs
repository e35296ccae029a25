#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::ProxmoxProviderData;
    use mockito::{Matcher, Server};
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::types::{has_errors, ClientCapabilities};

    const UPID: &str = "UPID:pve1:0000ABCD:00000001:6710ABCD:srvreload:networking:root@pam:";

    const LIST_BODY: &str = r#"{"data":[
        {"iface":"eno1","type":"eth","priority":3},
        {"iface":"vmbr1","type":"bridge","priority":7,"autostart":1,"cidr":"10.1.0.1/24",
         "bridge_ports":"eno1 eno2","bridge_vlan_aware":1,"mtu":"9000","comments":"lab\n"}
    ]}"#;

    fn state(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        ))
    }

    fn strings(values: &[&str]) -> Dynamic {
        Dynamic::List(values.iter().map(|v| Dynamic::String(v.to_string())).collect())
    }

    fn bridge(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        let mut base: Vec<(&str, Dynamic)> = vec![
            ("id", Dynamic::String("pve1:vmbr1".into())),
            ("node_name", Dynamic::String("pve1".into())),
            ("name", Dynamic::String("vmbr1".into())),
            ("address", Dynamic::Null),
            ("gateway", Dynamic::Null),
            ("address6", Dynamic::Null),
            ("gateway6", Dynamic::Null),
            ("autostart", Dynamic::Bool(true)),
            ("mtu", Dynamic::Null),
            ("comment", Dynamic::Null),
            ("ports", Dynamic::Null),
            ("vlan_aware", Dynamic::Bool(false)),
        ];
        for (key, value) in pairs {
            if let Some(entry) = base.iter_mut().find(|(k, _)| k == key) {
                entry.1 = value.clone();
            }
        }
        state(&base)
    }

    async fn configured(url: &str) -> LinuxBridgeResource {
        let mut resource = LinuxBridgeResource::new();
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

    async fn reload_ok(server: &mut mockito::ServerGuard) -> (mockito::Mock, mockito::Mock) {
        let reload = server
            .mock("PUT", "/api2/json/nodes/pve1/network")
            .with_status(200)
            .with_body(format!(r#"{{"data":"{}"}}"#, UPID))
            .create_async()
            .await;
        let status = server
            .mock(
                "GET",
                format!("/api2/json/nodes/pve1/tasks/{}/status", urlencoding::encode(UPID)).as_str(),
            )
            .with_status(200)
            .with_body(r#"{"data":{"status":"stopped","exitstatus":"OK"}}"#)
            .create_async()
            .await;
        (reload, status)
    }

    #[test]
    fn ports_are_sorted_and_joined() {
        let ports = vec![" eno2".to_string(), "".to_string(), "eno1".to_string()];
        assert_eq!(bridge_ports(&ports).as_deref(), Some("eno1 eno2"));
        assert_eq!(bridge_ports(&[]), None);
    }

    #[test]
    fn import_ids_need_node_and_iface() {
        assert_eq!(
            parse_bridge_id("pve1:vmbr1").unwrap(),
            ("pve1".to_string(), "vmbr1".to_string())
        );
        for bad in ["pve1", "pve1:", ":vmbr1", "a:b:c"] {
            let diag = parse_bridge_id(bad).unwrap_err();
            assert!(diag
                .detail
                .contains("Expected import identifier with format: `node_name:iface`"));
        }
    }

    #[tokio::test]
    async fn bridge_names_are_validated() {
        let resource = LinuxBridgeResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: resource.type_name().to_string(),
                    config: state(&[
                        ("node_name", Dynamic::String("pve1".into())),
                        ("name", Dynamic::String("br0".into())),
                    ]),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert!(has_errors(&response.diagnostics));
    }

    #[tokio::test]
    async fn create_posts_reads_back_and_reloads() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api2/json/nodes/pve1/network")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("iface".into(), "vmbr1".into()),
                Matcher::UrlEncoded("type".into(), "bridge".into()),
                Matcher::UrlEncoded("autostart".into(), "1".into()),
                Matcher::UrlEncoded("bridge_ports".into(), "eno1 eno2".into()),
                Matcher::UrlEncoded("bridge_vlan_aware".into(), "1".into()),
                Matcher::UrlEncoded("mtu".into(), "9000".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/api2/json/nodes/pve1/network")
            .with_status(200)
            .with_body(LIST_BODY)
            .create_async()
            .await;
        let (reload, _status) = reload_ok(&mut server).await;

        let resource = configured(&server.url()).await;
        let planned = bridge(&[
            ("id", Dynamic::Unknown),
            ("address", Dynamic::String("10.1.0.1/24".into())),
            ("mtu", Dynamic::Number(9000.0)),
            ("comment", Dynamic::String("lab".into())),
            ("ports", strings(&["eno2", "eno1"])),
            ("vlan_aware", Dynamic::Bool(true)),
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

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        create.assert_async().await;
        reload.assert_async().await;
        let new_state = response.new_state;
        assert_eq!(
            new_state.get_string(&AttributePath::new("id")).unwrap(),
            "pve1:vmbr1"
        );
        assert_eq!(
            new_state.get_string(&AttributePath::new("comment")).unwrap(),
            "lab"
        );
        assert_eq!(
            new_state
                .get_string_list(&AttributePath::new("ports"))
                .unwrap(),
            vec!["eno1".to_string(), "eno2".to_string()]
        );
    }

    #[test]
    fn cleared_fields_become_deletes() {
        let prior = bridge(&[
            ("gateway", Dynamic::String("10.1.0.254".into())),
            ("mtu", Dynamic::Number(9000.0)),
            ("vlan_aware", Dynamic::Bool(true)),
            ("gateway6", Dynamic::Null),
        ]);
        let plan = bridge(&[]);
        assert_eq!(
            cleared_fields(&prior, &plan),
            vec!["mtu", "gateway", "bridge_vlan_aware"]
        );
        assert!(cleared_fields(&plan, &plan).is_empty());
    }

    #[tokio::test]
    async fn update_sends_delete_list_and_reloads() {
        let mut server = Server::new_async().await;
        let update = server
            .mock("PUT", "/api2/json/nodes/pve1/network/vmbr1")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("iface".into(), "vmbr1".into()),
                Matcher::UrlEncoded("delete".into(), "mtu,gateway".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/api2/json/nodes/pve1/network")
            .with_status(200)
            .with_body(r#"{"data":[{"iface":"vmbr1","type":"bridge","autostart":1}]}"#)
            .create_async()
            .await;
        let (reload, _status) = reload_ok(&mut server).await;

        let resource = configured(&server.url()).await;
        let prior = bridge(&[
            ("gateway", Dynamic::String("10.1.0.254".into())),
            ("mtu", Dynamic::Number(9000.0)),
        ]);
        let planned = bridge(&[]);
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                    planned_identity: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        update.assert_async().await;
        reload.assert_async().await;
    }

    #[tokio::test]
    async fn read_of_missing_bridge_removes_it() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/api2/json/nodes/pve1/network")
            .with_status(200)
            .with_body(r#"{"data":[{"iface":"eno1","type":"eth"}]}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: resource.type_name().to_string(),
                    current_state: bridge(&[]),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                    current_identity: None,
                },
            )
            .await;

        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn delete_of_missing_bridge_warns() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/api2/json/nodes/pve1/network/vmbr1")
            .with_status(500)
            .with_body(r#"{"data":null,"message":"interface does not exist\n"}"#)
            .create_async()
            .await;
        let reload = server
            .mock("PUT", "/api2/json/nodes/pve1/network")
            .expect(0)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: bridge(&[]),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(!has_errors(&response.diagnostics));
        assert_eq!(
            response.diagnostics[0].summary,
            "Linux Bridge interface does not exist"
        );
        reload.assert_async().await;
    }

    #[tokio::test]
    async fn import_reads_bridge() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/api2/json/nodes/pve1/network")
            .with_status(200)
            .with_body(LIST_BODY)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: resource.type_name().to_string(),
                    id: "pve1:vmbr1".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let imported = &response.imported_resources[0].state;
        assert_eq!(imported.get_number(&AttributePath::new("mtu")).unwrap(), 9000.0);
        assert!(imported.get_bool(&AttributePath::new("vlan_aware")).unwrap());
        assert_eq!(
            imported.get_string(&AttributePath::new("address")).unwrap(),
            "10.1.0.1/24"
        );
    }
}
