use serde::{Deserialize, Serialize};

use crate::domain::entities::Document;

// Request payload for exchanging a bootstrap token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenExchangeRequest {
    pub token: String,
}

// Response payload for both identity endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub user_id: String,
}

// Response payload for a document read.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub data: Document,
}

// Response payload for a document append.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddDocumentResponse {
    pub id: String,
}

// Simple error envelope for JSON responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
