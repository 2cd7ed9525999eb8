//! HTTP and WebSocket server for the browser client

pub mod health;
pub mod hub;
pub mod interview;
pub mod voice;
pub mod websocket;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use hub::EventHub;

use crate::Result;
use crate::interview::InterviewController;
use crate::monitor::{ReportedFocus, ReportedPresence};
use crate::voice::{SpeechToText, TextToSpeech};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<InterviewController>,
    pub hub: EventHub,
    /// Face counts reported by clients, read by the presence watcher
    pub presence: Arc<ReportedPresence>,
    /// Tab visibility reported by clients, read by the focus watcher
    pub focus: Arc<ReportedFocus>,
    pub stt: Option<Arc<SpeechToText>>,
    pub tts: Option<Arc<TextToSpeech>>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    controller: Arc<InterviewController>,
    hub: EventHub,
    port: u16,
    presence: Arc<ReportedPresence>,
    focus: Arc<ReportedFocus>,
    stt: Option<Arc<SpeechToText>>,
    tts: Option<Arc<TextToSpeech>>,
    static_dir: Option<PathBuf>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    ///
    /// `hub` must be the transport the controller reports through.
    #[must_use]
    pub fn new(controller: Arc<InterviewController>, hub: EventHub, port: u16) -> Self {
        Self {
            controller,
            hub,
            port,
            presence: Arc::new(ReportedPresence::new()),
            focus: Arc::new(ReportedFocus::new()),
            stt: None,
            tts: None,
            static_dir: None,
        }
    }

    /// Share the presence probe the controller's watcher reads
    #[must_use]
    pub fn presence(mut self, presence: Arc<ReportedPresence>) -> Self {
        self.presence = presence;
        self
    }

    /// Share the focus probe the controller's watcher reads
    #[must_use]
    pub fn focus(mut self, focus: Arc<ReportedFocus>) -> Self {
        self.focus = focus;
        self
    }

    /// Set the speech-to-text client for `/api/voice/transcribe`
    #[must_use]
    pub fn stt(mut self, stt: Option<Arc<SpeechToText>>) -> Self {
        self.stt = stt;
        self
    }

    /// Set the text-to-speech client for `/api/voice/synthesize`
    #[must_use]
    pub fn tts(mut self, tts: Option<Arc<TextToSpeech>>) -> Self {
        self.tts = tts;
        self
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            controller: self.controller,
            hub: self.hub,
            presence: self.presence,
            focus: self.focus,
            stt: self.stt,
            tts: self.tts,
        });

        ApiServer {
            state,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    #[must_use]
    pub fn state(&self) -> &Arc<ApiState> {
        &self.state
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api", interview::router(self.state.clone()))
            .nest("/api/voice", voice::router(self.state.clone()))
            .merge(websocket::router(self.state.clone()))
            .merge(health::router(self.state.clone()));

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for the browser client served from another origin
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Transport(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
