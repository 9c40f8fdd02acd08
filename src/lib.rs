//! MediScan AI
//!
//! 약품 사진을 Gemini(Google 검색 그라운딩)로 식별하는 클라이언트

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod identifier;
pub mod interactive;
pub mod present;
pub mod runner;
pub mod session;
