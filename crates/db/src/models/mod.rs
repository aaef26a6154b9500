pub mod ai_history;
pub mod user_profile;
