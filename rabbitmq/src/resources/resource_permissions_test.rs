#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configured, state, string_at};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::has_errors;

    fn planned() -> DynamicValue {
        state(json!({
            "user": "alice",
            "vhost": "/",
            "permissions": [{"configure": ".*", "write": ".*", "read": "^amq\\..*"}]
        }))
    }

    #[tokio::test]
    async fn test_create_uses_user_at_vhost_id() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/permissions/%2F/alice")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/permissions/%2F/alice")
            .match_body(Matcher::Json(json!({
                "configure": ".*",
                "write": ".*",
                "read": "^amq\\..*"
            })))
            .with_status(201)
            .create_async()
            .await;
        server
            .mock("GET", "/api/permissions/%2F/alice")
            .with_status(200)
            .with_body(r#"{"user":"alice","vhost":"/","configure":".*","write":".*","read":"^amq\\..*"}"#)
            .create_async()
            .await;

        let resource: PermissionsResource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_permissions".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(string_at(&response.new_state, "id"), "alice@/");
        assert_eq!(
            response
                .new_state
                .get_string(&tfplug::AttributePath::new("permissions").index(0).attribute("read"))
                .unwrap(),
            "^amq\\..*"
        );
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_refuses_existing_permissions() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/permissions/%2F/alice")
            .with_status(200)
            .with_body(r#"{"configure":"","write":"","read":""}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/permissions/%2F/alice")
            .expect(0)
            .create_async()
            .await;

        let resource: PermissionsResource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "rabbitmq_permissions".to_string(),
                    planned_state: planned(),
                    config: planned(),
                },
            )
            .await;

        assert!(has_errors(&response.diagnostics));
        assert!(response.diagnostics[0].detail.contains("alice@/"));
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_malformed_id() {
        let server = Server::new_async().await;
        let resource: PermissionsResource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "rabbitmq_permissions".to_string(),
                    current_state: state(json!({"id": "alice"})),
                },
            )
            .await;

        assert!(has_errors(&response.diagnostics));
        assert_eq!(
            response.diagnostics[0].detail,
            "unable to parse resource id: alice"
        );
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_id_without_calling_api() {
        let mut server = Server::new_async().await;
        let get = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let resource: PermissionsResource = configured(&server.url()).await;
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "rabbitmq_permissions".to_string(),
                    id: "a@b@c".to_string(),
                },
            )
            .await;

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_import_existing_permissions() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/permissions/dev/bob")
            .with_status(200)
            .with_body(r#"{"user":"bob","vhost":"dev","configure":"","write":"x","read":"y"}"#)
            .create_async()
            .await;

        let resource: PermissionsResource = configured(&server.url()).await;
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "rabbitmq_permissions".to_string(),
                    id: "bob@dev".to_string(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let imported = &response.imported_resources[0].state;
        assert_eq!(string_at(imported, "user"), "bob");
        assert_eq!(string_at(imported, "vhost"), "dev");
    }

    #[tokio::test]
    async fn test_update_skips_unchanged_permissions() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/api/permissions/%2F/alice")
            .expect(0)
            .create_async()
            .await;
        server
            .mock("GET", "/api/permissions/%2F/alice")
            .with_status(200)
            .with_body(r#"{"configure":".*","write":".*","read":"^amq\\..*"}"#)
            .create_async()
            .await;

        let resource: PermissionsResource = configured(&server.url()).await;
        let mut prior = planned();
        prior
            .set_string(&tfplug::AttributePath::new("id"), "alice@/".to_string())
            .unwrap();
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "rabbitmq_permissions".to_string(),
                    prior_state: prior.clone(),
                    planned_state: prior.clone(),
                    config: prior,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        put.assert_async().await;
    }

    #[test]
    fn test_user_and_vhost_force_replacement() {
        use tfplug::plan_modifier::attributes_requiring_replace;
        use tfplug::types::AttributePath;

        let schema = PermissionsResource::schema_static();
        let prior = state(json!({
            "id": "alice@/",
            "user": "alice",
            "vhost": "/",
            "permissions": [{"configure": ".*", "write": ".*", "read": ".*"}],
        }));

        let narrowed = state(json!({
            "id": "alice@/",
            "user": "alice",
            "vhost": "/",
            "permissions": [{"configure": "", "write": "^logs$", "read": ".*"}],
        }));
        assert!(attributes_requiring_replace(&schema, &prior, &narrowed).is_empty());

        let moved = state(json!({
            "id": "alice@/",
            "user": "bob",
            "vhost": "dev",
            "permissions": [{"configure": ".*", "write": ".*", "read": ".*"}],
        }));
        assert_eq!(
            attributes_requiring_replace(&schema, &prior, &moved),
            vec![AttributePath::new("user"), AttributePath::new("vhost")]
        );
    }
}
