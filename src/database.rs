//! Binds parser → analyzer → engine into the single entry point the TCP
//! server calls per request.

use uuid::Uuid;

use crate::engine::Engine;
use crate::protocol::{Analyzer, Parser};

pub struct Database {
    parser: Parser,
    analyzer: Analyzer,
    engine: Engine,
}

impl Database {
    pub fn new(engine: Engine) -> Self {
        Database {
            parser: Parser::new(),
            analyzer: Analyzer::new(),
            engine,
        }
    }

    /// Parse, analyze, and execute one request line, rendering the wire
    /// response line regardless of outcome — parse/validation/WAL errors
    /// are reported in the `error: [ ]` slot, not propagated to the caller,
    /// so the connection stays open per the error-handling contract.
    pub async fn handle_request(&self, request_id: Uuid, text: &str) -> String {
        let result = self.run(request_id, text).await;
        match result {
            Ok(value) => format!("query result: [ {value} ] error: [ <nil> ] \n"),
            Err(e) => format!("query result: [  ] error: [ {e} ] \n"),
        }
    }

    async fn run(&self, request_id: Uuid, text: &str) -> crate::error::Result<String> {
        let tokens = self.parser.parse(text)?;
        let query = self.analyzer.analyze(tokens)?;
        self.engine.process(request_id, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Role;
    use crate::store::ShardManager;
    use std::sync::Arc;

    fn database() -> Database {
        let store = Arc::new(ShardManager::new());
        let engine = Engine::new(store, None, Role::Leader);
        Database::new(engine)
    }

    #[tokio::test]
    async fn set_then_get() {
        let db = database();
        let set_resp = db.handle_request(Uuid::new_v4(), "SET alpha 1").await;
        assert_eq!(set_resp, "query result: [  ] error: [ <nil> ] \n");

        let get_resp = db.handle_request(Uuid::new_v4(), "GET alpha").await;
        assert_eq!(get_resp, "query result: [ 1 ] error: [ <nil> ] \n");
    }

    #[tokio::test]
    async fn invalid_symbol_reports_parse_error() {
        let db = database();
        let resp = db.handle_request(Uuid::new_v4(), "SET привет x").await;
        assert!(resp.contains("ParseSymbol"));
    }

    #[tokio::test]
    async fn wrong_arity_reports_invalid_args() {
        let db = database();
        let resp = db.handle_request(Uuid::new_v4(), "SET k").await;
        assert!(resp.contains("InvalidSetArgs"));
    }

    #[tokio::test]
    async fn del_on_absent_key_succeeds() {
        let db = database();
        let resp = db.handle_request(Uuid::new_v4(), "DEL alpha").await;
        assert_eq!(resp, "query result: [  ] error: [ <nil> ] \n");
    }
}
