#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configured, state, string_at};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::has_errors;

    const PATH: &str = "/api/parameters/shovel/%2F/move";

    fn info_path(name: &str) -> AttributePath {
        AttributePath::new("info").index(0).attribute(name)
    }

    #[tokio::test]
    async fn test_validate_rejects_queue_and_exchange_together() {
        let resource = ShovelResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "rabbitmq_shovel".to_string(),
                    config: state(json!({
                        "name": "move",
                        "vhost": "/",
                        "info": [{
                            "source_uri": "amqp://a",
                            "destination_uri": "amqp://b",
                            "source_queue": "in",
                            "source_exchange": "events"
                        }]
                    })),
                },
            )
            .await;

        assert!(has_errors(&response.diagnostics));
        let conflict = response
            .diagnostics
            .iter()
            .find(|d| d.summary == "Conflicting configuration arguments")
            .unwrap();
        assert!(conflict.detail.contains("source_queue"));
    }

    #[tokio::test]
    async fn test_create_shovel() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", PATH)
            .match_body(Matcher::Json(json!({
                "value": {
                    "src-uri": ["amqp://a"],
                    "src-queue": "in",
                    "src-protocol": "amqp091",
                    "src-delete-after": 100,
                    "dest-uri": ["amqp://b"],
                    "dest-queue": "out",
                    "dest-protocol": "amqp091",
                    "dest-add-timestamp-header": false,
                    "dest-queue-args": {"x-queue-type": "quorum"},
                    "ack-mode": "on-confirm",
                    "reconnect-delay": 1
                }
            })))
            .with_status(201)
            .create_async()
            .await;
        server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(
                r#"{"name":"move","vhost":"/","component":"shovel","value":{
                    "src-uri":"amqp://a","src-queue":"in","src-protocol":"amqp091","src-delete-after":100,
                    "dest-uri":"amqp://b","dest-queue":"out","dest-protocol":"amqp091",
                    "dest-add-timestamp-header":false,"dest-queue-args":{"x-queue-type":"quorum"},
                    "ack-mode":"on-confirm","reconnect-delay":1}}"#,
            )
            .create_async()
            .await;

        let resource: ShovelResource = configured(&server.url()).await;
        let planned = state(json!({
            "name": "move",
            "vhost": "/",
            "info": [{
                "source_uri": "amqp://a",
                "source_queue": "in",
                "source_protocol": "amqp091",
                "source_delete_after": "100",
                "destination_uri": "amqp://b",
                "destination_queue": "out",
                "destination_protocol": "amqp091",
                "destination_add_timestamp_header": false,
                "destination_queue_arguments": {"x-queue-type": "quorum"},
                "ack_mode": "on-confirm",
                "reconnect_delay": 1
            }]
        }));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_shovel".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(string_at(&response.new_state, "id"), "move@/");
        let new_state = &response.new_state;
        assert_eq!(
            new_state.get_string(&info_path("source_delete_after")).unwrap(),
            "100"
        );
        assert_eq!(
            new_state
                .get_string(&info_path("destination_queue_arguments").key("x-queue-type"))
                .unwrap(),
            "quorum"
        );
        assert!(new_state
            .get(&info_path("source_exchange"))
            .unwrap()
            .is_null());
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_redeclares_changed_info() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", PATH)
            .match_body(Matcher::PartialJson(json!({
                "value": {"dest-queue": "archive", "src-delete-after": "never"}
            })))
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(
                r#"{"name":"move","vhost":"/","component":"shovel","value":{
                    "src-uri":["amqp://a"],"src-queue":"in","src-delete-after":"never",
                    "dest-uri":["amqp://b"],"dest-queue":"archive"}}"#,
            )
            .create_async()
            .await;

        let resource: ShovelResource = configured(&server.url()).await;
        let info = |queue: &str| {
            json!([{
                "source_uri": "amqp://a",
                "source_queue": "in",
                "source_delete_after": "never",
                "destination_uri": "amqp://b",
                "destination_queue": queue
            }])
        };
        let prior = state(json!({"id": "move@/", "name": "move", "vhost": "/", "info": info("out")}));
        let planned = state(json!({"id": "move@/", "name": "move", "vhost": "/", "info": info("archive")}));
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "rabbitmq_shovel".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response
                .new_state
                .get_string(&info_path("destination_queue"))
                .unwrap(),
            "archive"
        );
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_tolerates_self_deleted_shovel() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", PATH)
            .with_status(404)
            .create_async()
            .await;

        let resource: ShovelResource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "rabbitmq_shovel".to_string(),
                    prior_state: state(json!({"id": "move@/"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        delete.assert_async().await;
    }
}
