//! Integration Tests Module
//!
//! End-to-end tests through the command layer and `AppState`, with a
//! scripted provider standing in for the Gemini API.

// Scripted provider shared by the tests
mod support;

// Analysis and dashboard flow through the commands
mod analysis_test;

// Chat turns grounded in a successful analysis
mod chat_test;

// Settings file and gateway rebuild
mod settings_test;
