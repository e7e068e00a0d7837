#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_helpers::{configure_data_source, state, string_at};
    use mockito::Server;
    use serde_json::json;

    const PATH: &str = "/api/queues/%2F/jobs";

    fn read_request() -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: "rabbitmq_queue".to_string(),
            config: state(json!({"name": "jobs", "vhost": "/"})),
        }
    }

    async fn data_source(url: &str) -> QueueDataSource {
        let data_source = QueueDataSource::new().with_poll_interval(Duration::from_millis(1));
        configure_data_source(data_source, url).await
    }

    #[tokio::test]
    async fn test_read_running_queue() {
        let mut server = Server::new_async().await;
        let get = server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(
                r#"{"name":"jobs","vhost":"/","durable":true,"auto_delete":false,"arguments":{},"type":"quorum","state":"running"}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let response = data_source(&server.url())
            .await
            .read(Context::new(), read_request())
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(string_at(&response.state, "id"), "jobs@/");
        assert_eq!(string_at(&response.state, "type"), "quorum");
        assert_eq!(string_at(&response.state, "status"), "running");
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_waits_for_status() {
        let mut server = Server::new_async().await;
        let starting = server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(r#"{"name":"jobs","vhost":"/","durable":true,"auto_delete":false,"arguments":{}}"#)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(
                r#"{"name":"jobs","vhost":"/","durable":true,"auto_delete":false,"arguments":{},"type":"classic","state":"running"}"#,
            )
            .create_async()
            .await;

        let response = data_source(&server.url())
            .await
            .read(Context::new(), read_request())
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(string_at(&response.state, "status"), "running");
        starting.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_gives_up_waiting_for_status() {
        let mut server = Server::new_async().await;
        let get = server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(r#"{"name":"jobs","vhost":"/","durable":true,"auto_delete":false,"arguments":{}}"#)
            .expect(10)
            .create_async()
            .await;

        let response = data_source(&server.url())
            .await
            .read(Context::new(), read_request())
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(response
            .state
            .get(&tfplug::types::AttributePath::new("status"))
            .unwrap()
            .is_null());
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_missing_queue_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/queues/dev/jobs")
            .with_status(404)
            .create_async()
            .await;

        let response = data_source(&server.url())
            .await
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "rabbitmq_queue".to_string(),
                    config: state(json!({"name": "jobs", "vhost": "dev"})),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to read queue");
        assert_eq!(
            response.diagnostics[0].detail,
            "queue 'jobs@dev' is not found"
        );
    }
}
