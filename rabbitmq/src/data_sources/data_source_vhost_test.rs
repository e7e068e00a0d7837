#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configure_data_source, state, string_at};
    use mockito::Server;
    use serde_json::json;
    use tfplug::types::AttributePath;

    fn read_request(name: &str) -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: "rabbitmq_vhost".to_string(),
            config: state(json!({"name": name})),
        }
    }

    #[tokio::test]
    async fn test_schema_only_requires_name() {
        let data_source = VhostDataSource::new();
        let response = data_source
            .schema(Context::new(), DataSourceSchemaRequest)
            .await;

        let schema = response.schema;
        assert!(schema.attribute("name").unwrap().required);
        assert!(schema.attribute("tracing").unwrap().computed);
        assert!(schema.attribute("max_queues").unwrap().computed);
    }

    #[tokio::test]
    async fn test_read_without_provider_data() {
        let data_source = VhostDataSource::new();
        let response = data_source.read(Context::new(), read_request("dev")).await;

        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn test_read_vhost_with_limits() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/vhosts/dev")
            .with_status(200)
            .with_body(
                r#"{"name":"dev","description":"development","default_queue_type":"quorum","tracing":true}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/vhost-limits/dev")
            .with_status(200)
            .with_body(r#"[{"vhost":"dev","value":{"max-queues":20}}]"#)
            .create_async()
            .await;

        let data_source = configure_data_source(VhostDataSource::new(), &server.url()).await;
        let response = data_source.read(Context::new(), read_request("dev")).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.state;
        assert_eq!(string_at(state, "id"), "dev");
        assert_eq!(string_at(state, "description"), "development");
        assert_eq!(string_at(state, "default_queue_type"), "quorum");
        assert!(state.get_bool(&AttributePath::new("tracing")).unwrap());
        assert_eq!(string_at(state, "max_queues"), "20");
        assert!(state
            .get(&AttributePath::new("max_connections"))
            .unwrap()
            .is_null());
    }

    #[tokio::test]
    async fn test_read_missing_vhost_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/vhosts/staging")
            .with_status(404)
            .with_body(r#"{"error":"Object Not Found","reason":"Not Found"}"#)
            .create_async()
            .await;

        let data_source = configure_data_source(VhostDataSource::new(), &server.url()).await;
        let response = data_source
            .read(Context::new(), read_request("staging"))
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Failed to read vhost");
        assert_eq!(
            response.diagnostics[0].detail,
            "vhost 'staging' is not found"
        );
    }
}
