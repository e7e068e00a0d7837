#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configured, state, string_at};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::has_errors;

    const BETWEEN: &str = "/api/bindings/%2F/e/amq.topic/q/my-queue";

    #[tokio::test]
    async fn test_validate_rejects_both_argument_forms() {
        let resource = BindingResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "rabbitmq_binding".to_string(),
                    config: state(json!({
                        "source": "amq.topic",
                        "vhost": "/",
                        "destination": "my-queue",
                        "destination_type": "queue",
                        "arguments": {"x-match": "all"},
                        "arguments_json": "{\"x-match\": \"all\"}"
                    })),
                },
            )
            .await;

        assert!(has_errors(&response.diagnostics));
        assert_eq!(
            response.diagnostics[0].summary,
            "Conflicting configuration arguments"
        );
    }

    #[tokio::test]
    async fn test_create_takes_properties_key_from_location() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", BETWEEN)
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;
        let declare = server
            .mock("POST", BETWEEN)
            .match_body(Matcher::Json(json!({
                "routing_key": "route.#",
                "arguments": {}
            })))
            .with_status(201)
            .with_header("Location", "bindings/%2F/e/amq.topic/q/my-queue/route.%23")
            .create_async()
            .await;
        server
            .mock("GET", BETWEEN)
            .with_status(200)
            .with_body(
                r#"[{"source":"amq.topic","vhost":"/","destination":"my-queue","destination_type":"queue",
                     "routing_key":"route.#","arguments":{},"properties_key":"route.#"}]"#,
            )
            .create_async()
            .await;

        let resource: BindingResource = configured(&server.url()).await;
        let planned = state(json!({
            "source": "amq.topic",
            "vhost": "/",
            "destination": "my-queue",
            "destination_type": "queue",
            "routing_key": "route.#"
        }));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_binding".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            string_at(&response.new_state, "id"),
            "%2F/amq.topic/my-queue/queue/route.#"
        );
        assert_eq!(string_at(&response.new_state, "properties_key"), "route.#");
        assert!(response
            .new_state
            .get(&AttributePath::new("arguments"))
            .unwrap()
            .is_null());
        declare.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_refuses_identical_binding() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", BETWEEN)
            .with_status(200)
            .with_body(
                r#"[{"source":"amq.topic","vhost":"/","destination":"my-queue","destination_type":"queue",
                     "routing_key":"","arguments":{},"properties_key":"~"}]"#,
            )
            .create_async()
            .await;
        let declare = server
            .mock("POST", BETWEEN)
            .expect(0)
            .create_async()
            .await;

        let resource: BindingResource = configured(&server.url()).await;
        let planned = state(json!({
            "source": "amq.topic",
            "vhost": "/",
            "destination": "my-queue",
            "destination_type": "queue"
        }));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_binding".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(has_errors(&response.diagnostics));
        assert!(response.diagnostics[0].detail.contains("already exists"));
        declare.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_clears_state_without_matching_key() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", BETWEEN)
            .with_status(200)
            .with_body(
                r#"[{"source":"amq.topic","vhost":"/","destination":"my-queue","destination_type":"queue",
                     "routing_key":"other","arguments":{},"properties_key":"other"}]"#,
            )
            .create_async()
            .await;

        let resource: BindingResource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "rabbitmq_binding".to_string(),
                    current_state: state(json!({"id": "%2F/amq.topic/my-queue/queue/route.%23"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn test_read_moves_typed_arguments_to_json() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/bindings/dev/e/events/e/audit")
            .with_status(200)
            .with_body(
                r#"[{"source":"events","vhost":"dev","destination":"audit","destination_type":"exchange",
                     "routing_key":"","arguments":{"x-priority":5},"properties_key":"~abc"}]"#,
            )
            .create_async()
            .await;

        let resource: BindingResource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "rabbitmq_binding".to_string(),
                    current_state: state(json!({"id": "dev/events/audit/exchange/~abc"})),
                },
            )
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(string_at(&state, "arguments_json"), r#"{"x-priority":5}"#);
        assert_eq!(string_at(&state, "destination_type"), "exchange");
    }

    #[tokio::test]
    async fn test_import_rejects_short_id() {
        let mut server = Server::new_async().await;
        let lookup = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let resource: BindingResource = configured(&server.url()).await;
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "rabbitmq_binding".to_string(),
                    id: "%2F/amq.topic/my-queue".to_string(),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
        assert!(response.diagnostics[0]
            .detail
            .starts_with("Unable to determine binding ID"));
        lookup.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_uses_properties_key() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", "/api/bindings/%2F/e/amq.topic/q/my-queue/route.%23")
            .with_status(204)
            .create_async()
            .await;

        let resource: BindingResource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "rabbitmq_binding".to_string(),
                    prior_state: state(json!({"id": "%2F/amq.topic/my-queue/queue/route.#"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        delete.assert_async().await;
    }
}
