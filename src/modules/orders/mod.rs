pub mod error;
pub mod models;
pub mod workflow;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use bookstore_db::{EntityStore, Order};
use bookstore_http::error::AppError;
use bookstore_kernel::{InitCtx, Module};
use serde_json::json;
use uuid::Uuid;

use crate::modules::store_error;
use models::{
    AddItemRequest, CreateOrder, ListOrdersParams, OrderLineResponse, OrderResponse,
    StatusUpdate,
};
use workflow::OrderWorkflow;

/// Orders and their lines. Line changes go through [`OrderWorkflow`] so
/// book stock moves in the same transaction.
pub struct OrdersModule {
    state: OrdersState,
}

#[derive(Clone)]
struct OrdersState {
    store: Arc<dyn EntityStore>,
    workflow: OrderWorkflow,
}

impl OrdersModule {
    pub fn new(store: Arc<dyn EntityStore>, workflow: OrderWorkflow) -> Self {
        Self {
            state: OrdersState { store, workflow },
        }
    }
}

#[async_trait]
impl Module for OrdersModule {
    fn name(&self) -> &'static str {
        "orders"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            deadline_ms = self.state.workflow.deadline().as_millis() as u64,
            "orders module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_orders).post(create_order))
            .route("/health", get(health_check))
            .route("/{id}", get(get_order))
            .route("/{id}/items", post(add_item))
            .route("/{id}/status", put(update_status))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let body = |schema: &str| {
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{schema}") }
                    }
                }
            })
        };
        let order = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Order" }
                    }
                }
            })
        };
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string", "format": "uuid" }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List orders",
                        "tags": ["Orders"],
                        "parameters": [
                            { "name": "purchaser_id", "in": "query", "required": false, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Orders, oldest first",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Order" }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Open an order",
                        "tags": ["Orders"],
                        "requestBody": body("CreateOrder"),
                        "responses": {
                            "201": order("Opened order"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get an order with its lines and total",
                        "tags": ["Orders"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": order("Order"),
                            "404": error("Order not found")
                        }
                    }
                },
                "/{id}/items": {
                    "post": {
                        "summary": "Add or remove units of a book on an order",
                        "tags": ["Orders"],
                        "parameters": [id_param.clone()],
                        "requestBody": body("AddItem"),
                        "responses": {
                            "200": {
                                "description": "Line after the change",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/OrderLine" }
                                    }
                                }
                            },
                            "400": error("Order closed, book archived, insufficient stock or too many units removed"),
                            "404": error("Order or book not found"),
                            "422": error("Validation error"),
                            "504": error("Transaction deadline exceeded")
                        }
                    }
                },
                "/{id}/status": {
                    "put": {
                        "summary": "Move an order through its lifecycle",
                        "tags": ["Orders"],
                        "parameters": [id_param],
                        "requestBody": body("StatusUpdate"),
                        "responses": {
                            "200": order("Updated order"),
                            "400": error("Transition not allowed"),
                            "404": error("Order not found")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Orders health check",
                        "tags": ["Orders"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "OrderStatus": {
                        "type": "string",
                        "enum": ["accepting_items", "submitted", "fulfilled", "cancelled"]
                    },
                    "OrderItem": {
                        "type": "object",
                        "properties": {
                            "order_id": { "type": "string", "format": "uuid" },
                            "book_id": { "type": "string", "format": "uuid" },
                            "book_name": { "type": "string" },
                            "book_units": { "type": "integer", "minimum": 1 },
                            "unit_price_at_order": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        }
                    },
                    "Order": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "purchaser_id": { "type": "string" },
                            "status": { "$ref": "#/components/schemas/OrderStatus" },
                            "items": { "type": "array", "items": { "$ref": "#/components/schemas/OrderItem" } },
                            "total_price": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        }
                    },
                    "OrderLine": {
                        "type": "object",
                        "properties": {
                            "order_id": { "type": "string", "format": "uuid" },
                            "book_id": { "type": "string", "format": "uuid" },
                            "book_units": { "type": "integer", "minimum": 0 },
                            "line": {
                                "oneOf": [
                                    { "$ref": "#/components/schemas/OrderItem" },
                                    { "type": "null" }
                                ]
                            }
                        }
                    },
                    "CreateOrder": {
                        "type": "object",
                        "properties": { "purchaser_id": { "type": "string" } },
                        "required": ["purchaser_id"]
                    },
                    "AddItem": {
                        "type": "object",
                        "properties": {
                            "book_id": { "type": "string", "format": "uuid" },
                            "units_to_add": { "type": "integer", "description": "Non-zero; negative returns units" }
                        },
                        "required": ["book_id", "units_to_add"]
                    },
                    "StatusUpdate": {
                        "type": "object",
                        "properties": { "status": { "$ref": "#/components/schemas/OrderStatus" } },
                        "required": ["status"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "orders module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "orders module stopped");
        Ok(())
    }
}

async fn health_check() -> &'static str {
    "orders module is healthy"
}

async fn create_order(
    State(state): State<OrdersState>,
    payload: Result<Json<CreateOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let mut tx = state.store.begin().await.map_err(store_error)?;
    let order = tx
        .insert_order(Order::new(request.purchaser_id.trim()))
        .await
        .map_err(store_error)?;
    tx.commit().await.map_err(store_error)?;

    tracing::info!(order_id = %order.id, purchaser_id = %order.purchaser_id, "order opened");
    Ok((StatusCode::CREATED, Json(order.into())))
}

async fn list_orders(
    State(state): State<OrdersState>,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let Query(params) = params?;
    let orders = state
        .store
        .list_orders(params.purchaser_id.as_deref())
        .await
        .map_err(store_error)?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

async fn get_order(
    State(state): State<OrdersState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let Path(id) = id?;
    let order = state.store.find_order(id).await.map_err(store_error)?;
    Ok(Json(order.into()))
}

async fn add_item(
    State(state): State<OrdersState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<OrderLineResponse>, AppError> {
    let Path(order_id) = id?;
    let Json(request) = payload?;
    let delta = request.delta()?;

    let line = state
        .workflow
        .apply_unit_delta(order_id, request.book_id, delta)
        .await?;
    Ok(Json(line.into()))
}

async fn update_status(
    State(state): State<OrdersState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let Path(id) = id?;
    let Json(update) = payload?;

    let mut tx = state.store.begin().await.map_err(store_error)?;
    let current = tx.get_order(id).await.map_err(store_error)?;
    if !current.status.can_transition_to(update.status) {
        return Err(AppError::bad_request(format!(
            "order {id} cannot move from {} to {}",
            current.status, update.status
        ))
        .with_code("invalid_status_transition"));
    }

    let order = tx
        .set_order_status(id, update.status)
        .await
        .map_err(store_error)?;
    tx.commit().await.map_err(store_error)?;

    tracing::info!(
        order_id = %id,
        from = %current.status,
        to = %order.status,
        "order status changed"
    );
    Ok(Json(order.into()))
}

/// Create a new instance of the orders module
pub fn create_module(store: Arc<dyn EntityStore>, workflow: OrderWorkflow) -> Arc<dyn Module> {
    Arc::new(OrdersModule::new(store, workflow))
}

#[cfg(test)]
mod tests {
    use crate::modules::test_support::{app, app_with_settings, send};
    use axum::http::{Method, StatusCode};
    use bookstore_db::{EntityStore, MemoryStore, RedbStore};
    use bookstore_kernel::settings::Settings;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::str::FromStr;
    use std::sync::Arc;

    fn backends() -> Vec<Arc<dyn EntityStore>> {
        vec![
            Arc::new(MemoryStore::in_memory()),
            Arc::new(RedbStore::open_in_memory().unwrap()),
        ]
    }

    async fn create_book(app: &axum::Router, inventory: u32) -> String {
        let (status, book) = send(
            app,
            Method::POST,
            "/api/books",
            Some(json!({"name": "Dune", "price": "12.50", "inventory": inventory})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        book["id"].as_str().unwrap().to_string()
    }

    async fn create_order(app: &axum::Router, purchaser: &str) -> String {
        let (status, order) = send(
            app,
            Method::POST,
            "/api/orders",
            Some(json!({"purchaser_id": purchaser})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["status"], "accepting_items");
        order["id"].as_str().unwrap().to_string()
    }

    async fn add(app: &axum::Router, order_id: &str, book_id: &str, units: i32) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            &format!("/api/orders/{order_id}/items"),
            Some(json!({"book_id": book_id, "units_to_add": units})),
        )
        .await
    }

    async fn inventory(app: &axum::Router, book_id: &str) -> u64 {
        let (_, book) = send(app, Method::GET, &format!("/api/books/{book_id}"), None).await;
        book["inventory"].as_u64().unwrap()
    }

    fn decimal(value: &Value) -> Decimal {
        match value {
            Value::String(text) => Decimal::from_str(text).unwrap(),
            other => Decimal::from_str(&other.to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn order_lines_move_stock_over_http() {
        for store in backends() {
            let app = app(store);
            let book_id = create_book(&app, 10).await;
            let order_id = create_order(&app, "reader-1").await;

            let (status, line) = add(&app, &order_id, &book_id, 3).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(line["book_units"], 3);
            assert_eq!(line["line"]["book_name"], "Dune");
            assert_eq!(inventory(&app, &book_id).await, 7);

            let (_, order) = send(&app, Method::GET, &format!("/api/orders/{order_id}"), None).await;
            assert_eq!(order["items"].as_array().unwrap().len(), 1);
            assert_eq!(decimal(&order["total_price"]), Decimal::new(3750, 2));

            let (status, line) = add(&app, &order_id, &book_id, -3).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(line["book_units"], 0);
            assert!(line["line"].is_null());
            assert_eq!(inventory(&app, &book_id).await, 10);
        }
    }

    #[tokio::test]
    async fn workflow_errors_map_to_statuses() {
        let app = app(Arc::new(MemoryStore::in_memory()));
        let book_id = create_book(&app, 2).await;
        let order_id = create_order(&app, "reader-1").await;

        let (status, body) = add(&app, &order_id, &book_id, 5).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "insufficient_inventory");

        let (status, body) = add(&app, &order_id, &book_id, -1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "book_not_at_order");

        let (status, body) = add(&app, &order_id, &book_id, 0).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");

        let (status, body) = add(&app, &order_id, &uuid::Uuid::now_v7().to_string(), 1).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "book_not_found");

        let (status, body) = add(&app, &uuid::Uuid::now_v7().to_string(), &book_id, 1).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "order_not_found");

        send(
            &app,
            Method::PATCH,
            &format!("/api/books/{book_id}"),
            Some(json!({"archived": true})),
        )
        .await;
        let (status, body) = add(&app, &order_id, &book_id, 1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "book_is_archived");
        assert_eq!(inventory(&app, &book_id).await, 2);
    }

    #[tokio::test]
    async fn status_transitions_close_the_order() {
        let app = app(Arc::new(MemoryStore::in_memory()));
        let book_id = create_book(&app, 5).await;
        let order_id = create_order(&app, "reader-1").await;
        let status_uri = format!("/api/orders/{order_id}/status");

        let (status, body) = send(&app, Method::PUT, &status_uri, Some(json!({"status": "fulfilled"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_status_transition");

        let (status, order) = send(&app, Method::PUT, &status_uri, Some(json!({"status": "submitted"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "submitted");

        let (status, body) = add(&app, &order_id, &book_id, 1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "order_not_accepting_items");

        let (status, _) = send(&app, Method::PUT, &status_uri, Some(json!({"status": "shipped"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn orders_list_by_purchaser() {
        let app = app(Arc::new(MemoryStore::in_memory()));
        create_order(&app, "reader-1").await;
        create_order(&app, "reader-2").await;
        create_order(&app, "reader-1").await;

        let (status, all) = send(&app, Method::GET, "/api/orders", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 3);

        let (_, mine) = send(&app, Method::GET, "/api/orders?purchaser_id=reader-1", None).await;
        let mine = mine.as_array().unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|order| order["purchaser_id"] == "reader-1"));

        let (status, _) = send(&app, Method::POST, "/api/orders", Some(json!({"purchaser_id": " "}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn openapi_lists_order_routes() {
        let app = app(Arc::new(MemoryStore::in_memory()));
        let (status, doc) = send(&app, Method::GET, "/docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/api/orders/{id}/items"]["post"].is_object());
        assert!(doc["paths"]["/api/books/"]["get"].is_object());
        assert!(doc["components"]["schemas"]["OrderLine"].is_object());
    }

    #[tokio::test]
    async fn transaction_deadline_answers_504() {
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::in_memory());
        let mut settings = Settings::default();
        settings.server.request_timeout_ms = 2000;
        settings.orders.transaction_timeout_ms = 50;
        let app = app_with_settings(store.clone(), &settings);
        let book_id = create_book(&app, 5).await;
        let order_id = create_order(&app, "reader-1").await;

        let blocker = store.begin().await.unwrap();
        let (status, body) = add(&app, &order_id, &book_id, 1).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["code"], "deadline_exceeded");

        blocker.rollback().await.unwrap();
        assert_eq!(inventory(&app, &book_id).await, 5);
    }
}
