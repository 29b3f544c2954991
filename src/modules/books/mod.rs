pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_db::{Book, EntityStore, Page};
use bookstore_http::error::AppError;
use bookstore_kernel::{settings::PaginationSettings, InitCtx, Module};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::modules::store_error;
use models::{CreateBook, ListBooksParams, UpdateBook};

/// Book catalog: listing, creation and catalog edits. Stock levels only
/// change through order lines once a book exists.
pub struct BooksModule {
    state: BooksState,
}

#[derive(Clone)]
struct BooksState {
    store: Arc<dyn EntityStore>,
    pagination: PaginationSettings,
}

impl BooksModule {
    pub fn new(store: Arc<dyn EntityStore>, pagination: PaginationSettings) -> Self {
        Self {
            state: BooksState { store, pagination },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = self.state.store.backend_name(),
            max_page_size = self.state.pagination.max_page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books).post(create_book))
            .route("/health", get(health_check))
            .route("/{id}", get(get_book).patch(update_book))
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
        let book = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Book" }
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
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "page", "in": "query", "required": false, "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "page_size", "in": "query", "required": false, "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "name", "in": "query", "required": false, "schema": { "type": "string" } },
                            { "name": "include_archived", "in": "query", "required": false, "schema": { "type": "boolean" } },
                            {
                                "name": "sort",
                                "in": "query",
                                "required": false,
                                "schema": { "type": "string", "enum": ["created_at", "name", "price", "inventory"] }
                            },
                            { "name": "order", "in": "query", "required": false, "schema": { "type": "string", "enum": ["asc", "desc"] } }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookPage" }
                                    }
                                }
                            },
                            "422": error("Invalid query parameters")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": book("Created book"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": book("Book"),
                            "404": error("Book not found")
                        }
                    },
                    "patch": {
                        "summary": "Update catalog fields of a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": book("Updated book"),
                            "404": error("Book not found"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
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
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "name": { "type": "string" },
                            "price": { "type": "string", "description": "Decimal amount" },
                            "inventory": { "type": "integer", "minimum": 0 },
                            "archived": { "type": "boolean" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "name", "price", "inventory", "archived", "created_at", "updated_at"]
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "items": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "page": { "type": "integer" },
                            "page_size": { "type": "integer" },
                            "total": { "type": "integer" }
                        },
                        "required": ["items", "page", "page_size", "total"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "price": { "type": "string", "description": "Decimal amount, not negative" },
                            "inventory": { "type": "integer", "minimum": 0 }
                        },
                        "required": ["name", "price", "inventory"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "price": { "type": "string" },
                            "archived": { "type": "boolean" }
                        }
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(state): State<BooksState>,
    params: Result<Query<ListBooksParams>, QueryRejection>,
) -> Result<Json<Page<Book>>, AppError> {
    let Query(params) = params?;
    let query = params.into_query(&state.pagination)?;
    let page = state.store.list_books(&query).await.map_err(store_error)?;
    Ok(Json(page))
}

async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let mut tx = state.store.begin().await.map_err(store_error)?;
    let book = tx
        .insert_book(Book::new(
            request.name.trim(),
            request.price,
            request.inventory,
        ))
        .await
        .map_err(store_error)?;
    tx.commit().await.map_err(store_error)?;

    tracing::info!(book_id = %book.id, inventory = book.inventory, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(
    State(state): State<BooksState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    let book = state.store.find_book(id).await.map_err(store_error)?;
    Ok(Json(book))
}

async fn update_book(
    State(state): State<BooksState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    let Json(changes) = payload?;
    changes.validate()?;

    let mut tx = state.store.begin().await.map_err(store_error)?;
    let mut book = tx.get_book(id).await.map_err(store_error)?;
    if let Some(name) = changes.name {
        book.name = name.trim().to_string();
    }
    if let Some(price) = changes.price {
        book.price = price;
    }
    if let Some(archived) = changes.archived {
        book.archived = archived;
    }
    book.updated_at = OffsetDateTime::now_utc();

    let book = tx.update_book(book).await.map_err(store_error)?;
    tx.commit().await.map_err(store_error)?;

    tracing::info!(book_id = %book.id, archived = book.archived, "book updated");
    Ok(Json(book))
}

/// Create a new instance of the books module
pub fn create_module(
    store: Arc<dyn EntityStore>,
    pagination: PaginationSettings,
) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, pagination))
}
