#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configure_data_source, state, string_at};
    use mockito::Server;
    use serde_json::json;
    use tfplug::types::AttributePath;

    #[test]
    fn test_schema_is_computed_apart_from_lookup_keys() {
        let schema = TypedExchangeDataSource::schema_for(ExchangeKind::DelayedMessage);
        assert!(schema.attribute("name").unwrap().required);
        assert!(schema.attribute("durable").unwrap().computed);
        assert!(schema.attribute("delayed_type").unwrap().computed);
        let argument = schema.nested_block("argument").unwrap();
        assert!(argument.block.attribute("key").unwrap().computed);

        let schema = TypedExchangeDataSource::schema_for(ExchangeKind::Headers);
        assert!(schema.attribute("delayed_type").is_none());
    }

    #[test]
    fn test_type_name_follows_kind() {
        let data_source = TypedExchangeDataSource::new(ExchangeKind::ConsistentHash);
        assert_eq!(data_source.type_name(), "rabbitmq_exchange_consistent_hash");
    }

    #[tokio::test]
    async fn test_read_delayed_exchange() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/exchanges/%2F/later")
            .with_status(200)
            .with_body(
                r#"{"name":"later","vhost":"/","type":"x-delayed-message","durable":true,"auto_delete":false,
                    "internal":false,"arguments":{"x-delayed-type":"topic","x-max-hops":3}}"#,
            )
            .create_async()
            .await;

        let data_source = configure_data_source(
            TypedExchangeDataSource::new(ExchangeKind::DelayedMessage),
            &server.url(),
        )
        .await;
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "rabbitmq_exchange_delayed_message".to_string(),
                    config: state(json!({"name": "later", "vhost": "/"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.state;
        assert_eq!(string_at(state, "id"), "later@/");
        assert_eq!(string_at(state, "type"), "x-delayed-message");
        assert_eq!(string_at(state, "delayed_type"), "topic");

        let argument = |name: &str| AttributePath::new("argument").index(0).attribute(name);
        assert_eq!(state.get_list(&AttributePath::new("argument")).unwrap().len(), 1);
        assert_eq!(state.get_string(&argument("key")).unwrap(), "x-max-hops");
        assert_eq!(state.get_string(&argument("value")).unwrap(), "3");
        assert_eq!(state.get_string(&argument("type")).unwrap(), "numeric");
    }

    #[tokio::test]
    async fn test_read_missing_exchange_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/exchanges/%2F/gone")
            .with_status(404)
            .create_async()
            .await;

        let data_source =
            configure_data_source(TypedExchangeDataSource::new(ExchangeKind::Fanout), &server.url())
                .await;
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "rabbitmq_exchange_fanout".to_string(),
                    config: state(json!({"name": "gone"})),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to read exchange");
        assert_eq!(response.diagnostics[0].detail, "exchange 'gone@/' is not found");
    }
}
