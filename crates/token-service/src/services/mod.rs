//! Business logic for the Token Issuer.

pub mod token_service;
