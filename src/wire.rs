use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::SecondsFormat;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use ulid::Ulid;

use crate::auth::{self, RoomwardAuthSource};
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability;
use crate::sql::{self, Command};
use crate::tenant::TenantManager;

pub struct RoomwardHandler {
    tenant_manager: Arc<TenantManager>,
    reviewers: Arc<HashSet<String>>,
    query_parser: Arc<RoomwardQueryParser>,
}

impl RoomwardHandler {
    pub fn new(tenant_manager: Arc<TenantManager>, reviewers: Arc<HashSet<String>>) -> Self {
        Self {
            tenant_manager,
            reviewers,
            query_parser: Arc::new(RoomwardQueryParser),
        }
    }

    fn resolve_engine<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Engine>> {
        let db = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.tenant_manager.get_or_create(&db).map_err(|e| {
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "08006".into(),
                format!("tenant error: {e}"),
            )))
        })
    }

    /// The startup `user` parameter is the caller's identity; reviewer
    /// standing comes from the server's configured reviewer set.
    fn resolve_identity<C: ClientInfo>(&self, client: &C) -> Identity {
        let user = client.metadata().get("user").cloned().unwrap_or_default();
        auth::identity_for(&user, &self.reviewers)
    }

    async fn dispatch(
        &self,
        engine: &Engine,
        actor: &Identity,
        cmd: Command,
    ) -> PgWireResult<Vec<Response>> {
        let label = observability::command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(engine, actor, cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(
        &self,
        engine: &Engine,
        actor: &Identity,
        cmd: Command,
    ) -> PgWireResult<Vec<Response>> {
        match cmd {
            Command::InsertLocation { id, name, address } => {
                engine
                    .create_location(actor, id, name, address)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateLocation { id, name, address } => {
                engine
                    .update_location(actor, id, name, address)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteLocation { id } => {
                engine.delete_location(actor, id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertRoom {
                id,
                location_id,
                name,
                capacity,
            } => {
                engine
                    .create_room(actor, id, location_id, name, capacity)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateRoom { id, name, capacity } => {
                engine
                    .update_room(actor, id, name, capacity)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteRoom { id } => {
                engine.delete_room(actor, id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertReservation {
                id,
                room_id,
                start,
                end,
                purpose,
                attendees,
            } => {
                engine
                    .request_reservation(actor, id, room_id, start, end, purpose, attendees)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::DecideReservation { id, status } => {
                engine
                    .decide_reservation(actor, id, status)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteReservation { id } => {
                engine
                    .cancel_reservation(actor, id)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertFeedback {
                id,
                reservation_id,
                rating,
                comment,
            } => {
                engine
                    .leave_feedback(actor, id, reservation_id, rating, comment)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateFeedback {
                id,
                rating,
                comment,
            } => {
                engine
                    .update_feedback(actor, id, rating, comment)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteFeedback { id } => {
                engine.delete_feedback(actor, id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::DetachUser { user_id } => {
                engine
                    .detach_user(actor, &user_id)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::SelectLocations => {
                let locations = engine.list_locations();
                let schema = Arc::new(locations_schema());
                let rows: Vec<PgWireResult<_>> = locations
                    .into_iter()
                    .map(|loc| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&loc.id.to_string())?;
                        encoder.encode_field(&loc.name)?;
                        encoder.encode_field(&loc.address)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectRooms {
                available_from,
                available_to,
            } => {
                let rooms = engine
                    .list_rooms(available_from, available_to)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(rooms_schema());
                let rows: Vec<PgWireResult<_>> = rooms
                    .into_iter()
                    .map(|room| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&room.id.to_string())?;
                        encoder.encode_field(&room.location_id.to_string())?;
                        encoder.encode_field(&room.name)?;
                        encoder.encode_field(&(room.capacity as i32))?;
                        encoder.encode_field(&format!("{:.2}", room.rating))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectReservations { room_id } => {
                let reservations = engine
                    .list_reservations(actor, room_id)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(reservations_schema());
                let rows: Vec<PgWireResult<_>> = reservations
                    .into_iter()
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.id.to_string())?;
                        encoder.encode_field(&r.room_id.to_string())?;
                        encoder.encode_field(&r.requester)?;
                        encoder.encode_field(&render_ms(r.start))?;
                        encoder.encode_field(&render_ms(r.end))?;
                        encoder.encode_field(&r.purpose)?;
                        encoder.encode_field(&(r.attendees as i32))?;
                        encoder.encode_field(&r.status.to_string())?;
                        encoder.encode_field(&render_ms(r.created_at))?;
                        encoder.encode_field(&render_ms(r.updated_at))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectFeedback { room_id } => {
                let feedback = engine
                    .list_feedback(actor, room_id)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(feedback_schema());
                let rows: Vec<PgWireResult<_>> = feedback
                    .into_iter()
                    .map(|f| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&f.id.to_string())?;
                        encoder.encode_field(&f.room_id.to_string())?;
                        encoder.encode_field(&f.reservation_id.to_string())?;
                        encoder.encode_field(&f.author)?;
                        encoder.encode_field(&(f.rating as i32))?;
                        encoder.encode_field(&f.comment)?;
                        encoder.encode_field(&render_ms(f.created_at))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectAvailability {
                room_id,
                start,
                end,
            } => {
                let info = engine
                    .check_room_availability(room_id, start, end)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(availability_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&info.room_id.to_string())?;
                // Postgres text format for booleans
                encoder.encode_field(&if info.available { "t" } else { "f" })?;
                encoder.encode_field(&render_ms(info.start))?;
                encoder.encode_field(&render_ms(info.end))?;
                let rows = vec![Ok(encoder.take_row())];
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::Listen { channel } => {
                parse_room_channel(&channel)?;
                Ok(vec![Response::Execution(Tag::new("LISTEN"))])
            }
            Command::Unlisten { channel } => {
                parse_room_channel(&channel)?;
                Ok(vec![Response::Execution(Tag::new("UNLISTEN"))])
            }
            Command::UnlistenAll => Ok(vec![Response::Execution(Tag::new("UNLISTEN"))]),
        }
    }
}

/// LISTEN/UNLISTEN channels are `room_<ulid>`.
fn parse_room_channel(channel: &str) -> PgWireResult<Ulid> {
    let id_str = channel.strip_prefix("room_").ok_or_else(|| {
        PgWireError::UserError(Box::new(ErrorInfo::new(
            "ERROR".into(),
            "42000".into(),
            format!("invalid channel: {channel} (expected room_{{id}})"),
        )))
    })?;
    Ulid::from_string(id_str).map_err(|e| {
        PgWireError::UserError(Box::new(ErrorInfo::new(
            "ERROR".into(),
            "42000".into(),
            format!("bad ULID in channel: {e}"),
        )))
    })
}

/// Ms back out to the wire contract: ISO-8601 UTC with milliseconds.
fn render_ms(ms: Ms) -> String {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}

fn locations_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("name".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("address".into(), None, None, Type::VARCHAR, FieldFormat::Text),
    ]
}

fn rooms_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new(
            "location_id".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
        FieldInfo::new("name".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("capacity".into(), None, None, Type::INT4, FieldFormat::Text),
        FieldInfo::new("rating".into(), None, None, Type::FLOAT8, FieldFormat::Text),
    ]
}

fn reservations_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("room_id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new(
            "requester".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
        FieldInfo::new("start".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("end".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("purpose".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("attendees".into(), None, None, Type::INT4, FieldFormat::Text),
        FieldInfo::new("status".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new(
            "created_at".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
        FieldInfo::new(
            "updated_at".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
    ]
}

fn feedback_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("room_id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new(
            "reservation_id".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
        FieldInfo::new("author".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("rating".into(), None, None, Type::INT4, FieldFormat::Text),
        FieldInfo::new("comment".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new(
            "created_at".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
    ]
}

fn availability_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("room_id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("available".into(), None, None, Type::BOOL, FieldFormat::Text),
        FieldInfo::new("start".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("end".into(), None, None, Type::VARCHAR, FieldFormat::Text),
    ]
}

/// Best-effort schema from raw SQL, for Describe before execution.
fn statement_schema(sql: &str) -> Vec<FieldInfo> {
    let upper = sql.to_uppercase();
    if !upper.contains("SELECT") {
        return vec![];
    }
    if upper.contains("AVAILABILITY") {
        availability_schema()
    } else if upper.contains("LOCATIONS") {
        locations_schema()
    } else if upper.contains("ROOMS") {
        rooms_schema()
    } else if upper.contains("RESERVATIONS") {
        reservations_schema()
    } else if upper.contains("FEEDBACK") {
        feedback_schema()
    } else {
        vec![]
    }
}

#[async_trait]
impl SimpleQueryHandler for RoomwardHandler {
    async fn do_query<C>(&self, client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let actor = self.resolve_identity(client);
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        self.dispatch(&engine, &actor, cmd).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct RoomwardQueryParser;

#[async_trait]
impl QueryParser for RoomwardQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(statement_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for RoomwardHandler {
    type Statement = String;
    type QueryParser = RoomwardQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let actor = self.resolve_identity(client);
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let mut responses = self.dispatch(&engine, &actor, cmd).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            statement_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(statement_schema(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start {
                if let Ok(n) = sql[start..i].parse::<usize>() {
                    if n > max {
                        max = n;
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let sql = portal.statement.statement.to_string();
    let params = &portal.parameters;
    let mut result = sql;

    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }

    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct RoomwardFactory {
    handler: Arc<RoomwardHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<RoomwardAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl RoomwardFactory {
    pub fn new(
        tenant_manager: Arc<TenantManager>,
        password: String,
        reviewers: Arc<HashSet<String>>,
    ) -> Self {
        let auth_source = RoomwardAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(RoomwardHandler::new(tenant_manager, reviewers)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for RoomwardFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Drive one client socket through the pgwire protocol until it closes.
pub async fn process_connection(
    socket: tokio::net::TcpStream,
    tenant_manager: Arc<TenantManager>,
    password: String,
    reviewers: Arc<HashSet<String>>,
    tls: Option<pgwire::tokio::TlsAcceptor>,
) -> Result<(), std::io::Error> {
    let factory = RoomwardFactory::new(tenant_manager, password, reviewers);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

fn engine_err(e: EngineError) -> PgWireError {
    let code = match &e {
        EngineError::NotFound(_) => "P0002",
        EngineError::Conflict(_) => "23P01",
        EngineError::Forbidden(_) => "42501",
        EngineError::AlreadyExists(_) | EngineError::InvalidArgument(_) => "22023",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::WalError(_) => "58030",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_params_finds_highest() {
        assert_eq!(count_params("SELECT * FROM rooms"), 0);
        assert_eq!(count_params("INSERT INTO locations (id, name, address) VALUES ($1, $2, $3)"), 3);
        assert_eq!(count_params("UPDATE reservations SET status = $2 WHERE id = $1"), 2);
    }

    #[test]
    fn room_channel_round_trip() {
        let id = Ulid::new();
        let parsed = parse_room_channel(&format!("room_{id}")).unwrap();
        assert_eq!(parsed, id);
        assert!(parse_room_channel("reservation_123").is_err());
        assert!(parse_room_channel("room_not-a-ulid").is_err());
    }

    #[test]
    fn render_ms_is_rfc3339_utc() {
        assert_eq!(render_ms(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(render_ms(1_767_258_000_000), "2026-01-01T09:00:00.000Z");
    }

    #[test]
    fn statement_schema_picks_table() {
        assert_eq!(statement_schema("SELECT * FROM locations").len(), 3);
        assert_eq!(statement_schema("SELECT * FROM rooms").len(), 5);
        assert_eq!(statement_schema("SELECT * FROM reservations").len(), 10);
        assert_eq!(statement_schema("SELECT * FROM feedback").len(), 7);
        assert_eq!(
            statement_schema("SELECT * FROM availability WHERE room_id = $1").len(),
            4
        );
        assert!(statement_schema("INSERT INTO rooms (id) VALUES ($1)").is_empty());
    }
}
