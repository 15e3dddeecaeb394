//! Minimal example: problem-details conversion, panic recovery, and request
//! logging that reads what was sent.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i http://localhost:3000/users/7        # 404 → application/problem+json
//!   curl -i -X DELETE http://localhost:3000/users/42   # 204, no body
//!   curl -i http://localhost:3000/boom          # 500 with panic detail
//!   curl -i http://localhost:3000/nowhere       # unmatched route → problem document

use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;
use problemdetails::middleware::{context, converter, recoverer};
use problemdetails::{
    BoxedHandler, Config, ProblemWriter, Request, ResponseWriter, ResponseWriterExt, Router, Server,
    handler_fn,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), problemdetails::Error> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .init();

    problemdetails::install_default(ProblemWriter::from_config(&config)?)?;
    let writer = problemdetails::default_writer();

    let app = Router::new()
        .layer(access_log)
        .layer(context)
        .layer(converter(Arc::clone(&writer), |req, status| {
            tracing::warn!(method = %req.method(), path = req.path(), status = status.as_u16(), "converted error response");
        }))
        .layer(recoverer(writer, config.stack_frame_idx))
        .get("/users/{id}", get_user)
        .delete("/users/{id}", delete_user)
        .get("/boom", boom);

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

/// Logs every request once the chain has finished, including the problem
/// document if one was sent.
fn access_log(next: BoxedHandler) -> BoxedHandler {
    handler_fn(move |w, req| {
        let started = Instant::now();
        next.call(w, req);
        match req.problem_details() {
            Some(pd) => tracing::info!(
                path = req.path(),
                status = pd.status,
                detail = %pd.detail,
                elapsed_us = started.elapsed().as_micros() as u64,
                "request failed"
            ),
            None => tracing::info!(
                path = req.path(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "request served"
            ),
        }
    })
}

// GET /users/{id}
fn get_user(w: &mut dyn ResponseWriter, req: &mut Request) {
    let Some(id) = req.param("id") else {
        w.write_header(StatusCode::BAD_REQUEST);
        return;
    };
    if id != "42" {
        // No body: the converter sends a problem document.
        w.write_header(StatusCode::NOT_FOUND);
        return;
    }
    let body = format!(r#"{{"id":"{id}","name":"alice"}}"#);
    let _ = w.json(StatusCode::OK, body.as_bytes());
}

// DELETE /users/{id} → 204 No Content
fn delete_user(w: &mut dyn ResponseWriter, _req: &mut Request) {
    w.write_header(StatusCode::NO_CONTENT);
}

// GET /boom → 500 problem document
fn boom(_w: &mut dyn ResponseWriter, _req: &mut Request) {
    let items: Vec<u32> = Vec::new();
    let _ = items[3];
}
