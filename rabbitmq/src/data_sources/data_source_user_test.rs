#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configure_data_source, state, string_at};
    use mockito::Server;
    use serde_json::json;
    use tfplug::types::AttributePath;

    fn read_request(name: &str) -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: "rabbitmq_user".to_string(),
            config: state(json!({"name": name})),
        }
    }

    #[tokio::test]
    async fn test_schema_exposes_no_password() {
        let data_source = UserDataSource::new();
        let response = data_source
            .schema(Context::new(), DataSourceSchemaRequest)
            .await;

        assert!(response.schema.attribute("password").is_none());
        assert!(response.schema.attribute("tags").unwrap().computed);
    }

    #[tokio::test]
    async fn test_read_user_tags_and_limits() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/users/alice")
            .with_status(200)
            .with_body(r#"{"name":"alice","tags":["administrator","management"],"password_hash":"x"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/user-limits/alice")
            .with_status(200)
            .with_body(r#"[{"user":"alice","value":{"max-channels":8}}]"#)
            .create_async()
            .await;

        let data_source = configure_data_source(UserDataSource::new(), &server.url()).await;
        let response = data_source.read(Context::new(), read_request("alice")).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.state;
        assert_eq!(string_at(state, "id"), "alice");
        let tags = state.get_list(&AttributePath::new("tags")).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(string_at(state, "max_channels"), "8");
        assert!(state
            .get(&AttributePath::new("max_connections"))
            .unwrap()
            .is_null());
    }

    #[tokio::test]
    async fn test_read_user_without_tags() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/users/bob")
            .with_status(200)
            .with_body(r#"{"name":"bob","tags":""}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/user-limits/bob")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let data_source = configure_data_source(UserDataSource::new(), &server.url()).await;
        let response = data_source.read(Context::new(), read_request("bob")).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let tags = response
            .state
            .get_list(&AttributePath::new("tags"))
            .unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_user_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/users/carol")
            .with_status(404)
            .create_async()
            .await;

        let data_source = configure_data_source(UserDataSource::new(), &server.url()).await;
        let response = data_source.read(Context::new(), read_request("carol")).await;

        assert_eq!(response.diagnostics[0].detail, "user 'carol' is not found");
    }
}
