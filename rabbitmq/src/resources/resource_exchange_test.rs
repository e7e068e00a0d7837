#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configured, state, string_at};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::has_errors;
    use tfplug::AttributePath;

    #[tokio::test]
    async fn test_schema_is_deprecated_and_replaces_on_settings_change() {
        let resource = ExchangeResource::new();
        let response = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await;

        let settings = response.schema.nested_block("settings").unwrap();
        assert_eq!(settings.max_items, 1);
        assert!(!settings
            .block
            .attribute("type")
            .unwrap()
            .plan_modifiers
            .is_empty());
    }

    #[tokio::test]
    async fn test_validate_warns_about_deprecation() {
        let resource = ExchangeResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "rabbitmq_exchange".to_string(),
                    config: state(json!({
                        "name": "logs",
                        "settings": [{"type": "fanout"}]
                    })),
                },
            )
            .await;

        assert!(!has_errors(&response.diagnostics));
        assert_eq!(response.diagnostics[0].summary, "Deprecated resource");
    }

    #[tokio::test]
    async fn test_create_declares_settings_block() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/exchanges/%2F/logs")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let declare = server
            .mock("PUT", "/api/exchanges/%2F/logs")
            .match_body(Matcher::Json(json!({
                "type": "fanout",
                "durable": false,
                "auto_delete": true,
                "internal": false,
                "arguments": {"x-note": "audit", "alternate-exchange": "spill"}
            })))
            .with_status(201)
            .create_async()
            .await;
        server
            .mock("GET", "/api/exchanges/%2F/logs")
            .with_status(200)
            .with_body(
                r#"{"name":"logs","vhost":"/","type":"fanout","durable":false,"auto_delete":true,"internal":false,
                    "arguments":{"x-note":"audit","alternate-exchange":"spill"}}"#,
            )
            .create_async()
            .await;

        let resource: ExchangeResource = configured(&server.url()).await;
        let planned = state(json!({
            "name": "logs",
            "vhost": "/",
            "settings": [{
                "type": "fanout",
                "durable": false,
                "auto_delete": true,
                "internal": false,
                "alternate_exchange": "spill",
                "arguments": {"x-note": "audit"}
            }]
        }));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_exchange".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(string_at(&response.new_state, "id"), "logs@/");
        let settings = AttributePath::new("settings").index(0);
        assert_eq!(
            response
                .new_state
                .get_string(&settings.clone().attribute("alternate_exchange"))
                .unwrap(),
            "spill"
        );
        assert_eq!(
            response
                .new_state
                .get_string(&settings.attribute("arguments").key("x-note"))
                .unwrap(),
            "audit"
        );
        declare.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_refuses_existing_exchange() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/exchanges/%2F/logs")
            .with_status(200)
            .with_body(r#"{"name":"logs","vhost":"/","type":"direct","durable":true,"auto_delete":false}"#)
            .create_async()
            .await;
        let declare = server
            .mock("PUT", "/api/exchanges/%2F/logs")
            .expect(0)
            .create_async()
            .await;

        let resource: ExchangeResource = configured(&server.url()).await;
        let planned = state(json!({"name": "logs", "settings": [{}]}));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_exchange".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(has_errors(&response.diagnostics));
        assert_eq!(
            response.diagnostics[0].detail,
            "exchange 'logs' already exists"
        );
        declare.assert_async().await;
    }

    #[tokio::test]
    async fn test_import_reads_settings() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/exchanges/dev/audit")
            .with_status(200)
            .with_body(
                r#"{"name":"audit","vhost":"dev","type":"topic","durable":true,"auto_delete":false,"internal":true,"arguments":{}}"#,
            )
            .create_async()
            .await;

        let resource: ExchangeResource = configured(&server.url()).await;
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "rabbitmq_exchange".to_string(),
                    id: "audit@dev".to_string(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let imported = &response.imported_resources[0].state;
        let settings = AttributePath::new("settings").index(0);
        assert_eq!(
            imported
                .get_string(&settings.clone().attribute("type"))
                .unwrap(),
            "topic"
        );
        assert!(imported
            .get_bool(&settings.clone().attribute("internal"))
            .unwrap());
        assert!(imported
            .get(&settings.attribute("arguments"))
            .unwrap()
            .is_null());
    }
}
