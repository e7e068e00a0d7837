#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configure, configured, state, string_at};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::{has_errors, AttributePath};

    fn definition(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn definition_at(state: &DynamicValue, key: &str) -> String {
        state
            .get_string(
                &AttributePath::new("policy")
                    .index(0)
                    .attribute("definition")
                    .key(key),
            )
            .unwrap()
    }

    #[test]
    fn integer_strings_are_sent_as_numbers() {
        let table = definition_to_api(definition(&[
            ("max-length", "1000"),
            ("overflow", "reject-publish"),
            ("ratio", "0.5"),
        ]));

        assert_eq!(table["max-length"], json!(1000));
        assert_eq!(table["overflow"], json!("reject-publish"));
        assert_eq!(table["ratio"], json!("0.5"));
    }

    #[test]
    fn ha_params_split_only_for_nodes_mode() {
        let nodes = definition_to_api(definition(&[
            ("ha-mode", "nodes"),
            ("ha-params", "rabbit@a,rabbit@b"),
        ]));
        assert_eq!(nodes["ha-params"], json!(["rabbit@a", "rabbit@b"]));

        let exactly = definition_to_api(definition(&[("ha-mode", "exactly"), ("ha-params", "2")]));
        assert_eq!(exactly["ha-params"], json!(2));
    }

    #[test]
    fn broker_values_render_as_strings() {
        let table: ArgumentTable = serde_json::from_value(json!({
            "max-length": 1000,
            "ratio": 0.5,
            "ha-params": ["rabbit@a", "rabbit@b"],
            "ha-mode": "nodes",
            "lazy": true
        }))
        .unwrap();

        let rendered = definition_from_api(&table);
        let rendered = rendered.as_map().unwrap();
        assert_eq!(rendered["max-length"], Dynamic::String("1000".to_string()));
        assert_eq!(rendered["ratio"], Dynamic::String("0.5".to_string()));
        assert_eq!(
            rendered["ha-params"],
            Dynamic::String("rabbit@a,rabbit@b".to_string())
        );
        assert_eq!(rendered["lazy"], Dynamic::String("true".to_string()));
    }

    #[tokio::test]
    async fn test_create_policy() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/policies/%2F/ha-all")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/policies/%2F/ha-all")
            .match_body(Matcher::Json(json!({
                "pattern": ".*",
                "apply-to": "queues",
                "priority": 1,
                "definition": {"ha-mode": "nodes", "ha-params": ["rabbit@a", "rabbit@b"]}
            })))
            .with_status(201)
            .create_async()
            .await;
        server
            .mock("GET", "/api/policies/%2F/ha-all")
            .with_status(200)
            .with_body(
                r#"{"name":"ha-all","vhost":"/","pattern":".*","apply-to":"queues","priority":1,
                    "definition":{"ha-mode":"nodes","ha-params":["rabbit@a","rabbit@b"]}}"#,
            )
            .create_async()
            .await;

        let resource: PolicyResource = configured(&server.url()).await;
        let planned = state(json!({
            "name": "ha-all",
            "vhost": "/",
            "policy": [{
                "pattern": ".*",
                "priority": 1,
                "apply_to": "queues",
                "definition": {"ha-mode": "nodes", "ha-params": "rabbit@a,rabbit@b"}
            }]
        }));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_policy".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(string_at(&response.new_state, "id"), "ha-all@/");
        assert_eq!(
            definition_at(&response.new_state, "ha-params"),
            "rabbit@a,rabbit@b"
        );
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_operator_policy_uses_its_own_collection() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/operator-policies/dev/cap")
            .with_status(200)
            .with_body(
                r#"{"name":"cap","vhost":"dev","pattern":"^jobs","apply-to":"queues","priority":0,
                    "definition":{"max-length":1000}}"#,
            )
            .create_async()
            .await;

        let resource = configure(PolicyResource::operator_policy(), &server.url()).await;
        assert_eq!(resource.type_name(), "rabbitmq_operator_policy");

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "rabbitmq_operator_policy".to_string(),
                    current_state: state(json!({"id": "cap@dev"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state.unwrap();
        assert_eq!(definition_at(&state, "max-length"), "1000");
    }

    #[tokio::test]
    async fn test_create_refuses_existing_policy() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/policies/%2F/ha-all")
            .with_status(200)
            .with_body(r#"{"name":"ha-all","vhost":"/","pattern":".*","apply-to":"all","priority":0}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/policies/%2F/ha-all")
            .expect(0)
            .create_async()
            .await;

        let resource: PolicyResource = configured(&server.url()).await;
        let planned = state(json!({
            "name": "ha-all",
            "vhost": "/",
            "policy": [{"pattern": ".*", "priority": 0, "apply_to": "all", "definition": {}}]
        }));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_policy".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(has_errors(&response.diagnostics));
        assert_eq!(
            response.diagnostics[0].detail,
            "policy 'ha-all' already exists"
        );
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_puts_changed_policy() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/api/policies/%2F/ttl")
            .match_body(Matcher::PartialJson(json!({
                "priority": 2,
                "definition": {"message-ttl": 60000}
            })))
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("GET", "/api/policies/%2F/ttl")
            .with_status(200)
            .with_body(
                r#"{"name":"ttl","vhost":"/","pattern":".*","apply-to":"queues","priority":2,
                    "definition":{"message-ttl":60000}}"#,
            )
            .create_async()
            .await;

        let resource: PolicyResource = configured(&server.url()).await;
        let prior = state(json!({
            "id": "ttl@/",
            "name": "ttl",
            "vhost": "/",
            "policy": [{"pattern": ".*", "priority": 1, "apply_to": "queues",
                        "definition": {"message-ttl": "30000"}}]
        }));
        let planned = state(json!({
            "id": "ttl@/",
            "name": "ttl",
            "vhost": "/",
            "policy": [{"pattern": ".*", "priority": 2, "apply_to": "queues",
                        "definition": {"message-ttl": "60000"}}]
        }));
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "rabbitmq_policy".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(definition_at(&response.new_state, "message-ttl"), "60000");
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_policy() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", "/api/policies/%2F/gone")
            .with_status(404)
            .create_async()
            .await;

        let resource: PolicyResource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "rabbitmq_policy".to_string(),
                    prior_state: state(json!({"id": "gone@/"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        delete.assert_async().await;
    }
}
