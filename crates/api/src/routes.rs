use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use crate::{error::{ApiError, ApiResult}, state::AppState};

#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: u32,
    pub title: String,
    pub author: String,
}

impl Book {
    pub fn samples() -> Vec<Book> {
        [
            (1, "The Hound of the Baskervilles", "Arthur Conan Doyle"),
            (2, "A Study in Scarlet", "Arthur Conan Doyle"),
            (3, "The Sign of the Four", "Arthur Conan Doyle"),
        ]
        .into_iter()
        .map(|(id, title, author)| Book { id, title: title.into(), author: author.into() })
        .collect()
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(book_routes())
}

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/book", get(list_books))
        .route("/book/:id", get(get_book).delete(delete_book))
}

async fn health() -> impl IntoResponse { (StatusCode::OK, "ok") }

async fn list_books(State(state): State<AppState>) -> Json<Vec<Book>> {
    Json(state.books.read().await.clone())
}

async fn get_book(State(state): State<AppState>, Path(id): Path<u32>) -> ApiResult<Json<Book>> {
    let books = state.books.read().await;
    books.iter().find(|b| b.id == id).cloned().map(Json).ok_or(ApiError::NotFound)
}

async fn delete_book(State(state): State<AppState>, Path(id): Path<u32>) -> ApiResult<StatusCode> {
    let mut books = state.books.write().await;
    let before = books.len();
    books.retain(|b| b.id != id);
    if books.len() == before {
        return Err(ApiError::NotFound);
    }
    tracing::info!(id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}
