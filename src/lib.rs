// Credential bundle, encryption, and persistence backends
pub mod credentials;

// OAuth2 bootstrap and token lifecycle
pub mod oauth;

// Authorized artifact installation
pub mod install;

// mk variable generation
pub mod mkvars;

// Archive dependency generation
pub mod bindeps;
