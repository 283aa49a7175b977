use std::{convert::Infallible, io::Write, net::SocketAddr};

use anyhow::Context;
use async_graphql_warp::GraphQLResponse;
use tempfile::NamedTempFile;
use tracing::{error, info};
use warp::{http::StatusCode, hyper::body::Bytes, Filter, Reply};

use crate::{
    api::Schema,
    ingest::{self, IngestReport},
    lexicon::Lexicon,
    Database,
};

pub(crate) async fn serve(schema: Schema, database: Database, lexicon: Lexicon, addr: SocketAddr) {
    info!("listening on {addr}");
    warp::serve(routes(schema, database, lexicon)).run(addr).await;
}

fn routes(
    schema: Schema,
    database: Database,
    lexicon: Lexicon,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let graphql = warp::path("graphql").and(async_graphql_warp::graphql(schema)).and_then(
        |(schema, request): (Schema, async_graphql::Request)| async move {
            Ok::<_, Infallible>(GraphQLResponse::from(schema.execute(request).await))
        },
    );

    let upload = warp::path("upload")
        .and(warp::post())
        .and(warp::body::bytes())
        .map(move |body: Bytes| upload_reply(&database, &lexicon, &body));

    graphql.or(upload)
}

fn upload_reply(db: &Database, lexicon: &Lexicon, body: &[u8]) -> warp::reply::Response {
    match ingest_upload(db, lexicon, body) {
        Ok(report) => warp::reply::json(&report).into_response(),
        Err(e) => {
            error!("CSV ingestion failed: {e:#}");
            let payload = serde_json::json!({ "error": format!("{e:#}") });
            warp::reply::with_status(
                warp::reply::json(&payload),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
    }
}

/// Spool the upload to a temporary file and ingest from it. The spool is
/// removed only once the storage write has been acknowledged; on failure it
/// is preserved for inspection.
fn ingest_upload(db: &Database, lexicon: &Lexicon, body: &[u8]) -> anyhow::Result<IngestReport> {
    let mut spool = NamedTempFile::new().context("cannot create upload spool")?;
    spool.write_all(body).context("cannot write upload spool")?;
    let reader = spool.reopen().context("cannot reopen upload spool")?;
    match ingest::ingest_csv(db, lexicon, reader) {
        Ok(report) => {
            spool.close().context("cannot remove upload spool")?;
            Ok(report)
        }
        Err(e) => {
            match spool.keep() {
                Ok((_, path)) => error!("upload spool preserved at {}", path.display()),
                Err(keep_err) => error!("cannot preserve upload spool: {keep_err}"),
            }
            Err(e)
        }
    }
}
