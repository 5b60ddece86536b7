pub mod api;
pub mod audio;
pub mod calls;
pub mod voices;
pub mod webhooks;
