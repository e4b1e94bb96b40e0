use sqlparser::ast::{self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertLocation {
        id: Ulid,
        name: String,
        address: String,
    },
    UpdateLocation {
        id: Ulid,
        name: String,
        address: String,
    },
    DeleteLocation {
        id: Ulid,
    },
    InsertRoom {
        id: Ulid,
        location_id: Ulid,
        name: String,
        capacity: u32,
    },
    UpdateRoom {
        id: Ulid,
        name: String,
        capacity: u32,
    },
    DeleteRoom {
        id: Ulid,
    },
    InsertReservation {
        id: Ulid,
        room_id: Ulid,
        start: Ms,
        end: Ms,
        purpose: String,
        attendees: u32,
    },
    DecideReservation {
        id: Ulid,
        status: ReservationStatus,
    },
    DeleteReservation {
        id: Ulid,
    },
    InsertFeedback {
        id: Ulid,
        reservation_id: Ulid,
        rating: u8,
        comment: String,
    },
    UpdateFeedback {
        id: Ulid,
        rating: u8,
        comment: String,
    },
    DeleteFeedback {
        id: Ulid,
    },
    DetachUser {
        user_id: String,
    },
    SelectLocations,
    SelectRooms {
        available_from: Option<Ms>,
        available_to: Option<Ms>,
    },
    SelectReservations {
        room_id: Option<Ulid>,
    },
    SelectFeedback {
        room_id: Option<Ulid>,
    },
    SelectAvailability {
        room_id: Ulid,
        start: Ms,
        end: Ms,
    },
    Listen {
        channel: String,
    },
    Unlisten {
        channel: String,
    },
    UnlistenAll,
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let trimmed = sql.trim();
    let upper = trimmed.to_uppercase();
    if upper.starts_with("LISTEN ") {
        let channel = trimmed[7..].trim().trim_matches(';').to_string();
        return Ok(Command::Listen { channel });
    }
    if upper.starts_with("UNLISTEN") {
        let target = trimmed[8..].trim().trim_matches(';').trim();
        return match target {
            "" => Err(SqlError::Parse("UNLISTEN requires a channel or *".into())),
            "*" => Ok(Command::UnlistenAll),
            channel => Ok(Command::Unlisten {
                channel: channel.to_string(),
            }),
        };
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "locations" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("locations", 3, values.len()));
            }
            Ok(Command::InsertLocation {
                id: parse_ulid(&values[0])?,
                name: parse_string(&values[1])?,
                address: parse_string(&values[2])?,
            })
        }
        "rooms" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("rooms", 4, values.len()));
            }
            Ok(Command::InsertRoom {
                id: parse_ulid(&values[0])?,
                location_id: parse_ulid(&values[1])?,
                name: parse_string(&values[2])?,
                capacity: parse_u32(&values[3])?,
            })
        }
        "reservations" => {
            if values.len() < 5 {
                return Err(SqlError::WrongArity("reservations", 5, values.len()));
            }
            let attendees = if values.len() >= 6 {
                parse_u32(&values[5])?
            } else {
                0
            };
            Ok(Command::InsertReservation {
                id: parse_ulid(&values[0])?,
                room_id: parse_ulid(&values[1])?,
                start: parse_ms(&values[2])?,
                end: parse_ms(&values[3])?,
                purpose: parse_string(&values[4])?,
                attendees,
            })
        }
        "feedback" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("feedback", 4, values.len()));
            }
            Ok(Command::InsertFeedback {
                id: parse_ulid(&values[0])?,
                reservation_id: parse_ulid(&values[1])?,
                rating: parse_u8(&values[2])?,
                comment: parse_string(&values[3])?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(&table.relation)?;
    let id = extract_where_id(selection)?;

    match table.as_str() {
        "locations" => Ok(Command::UpdateLocation {
            id,
            name: assignment_string(assignments, "name")?,
            address: assignment_string(assignments, "address")?,
        }),
        "rooms" => Ok(Command::UpdateRoom {
            id,
            name: assignment_string(assignments, "name")?,
            capacity: assignment_u32(assignments, "capacity")?,
        }),
        "reservations" => {
            let raw = assignment_string(assignments, "status")?;
            let status = raw
                .parse::<ReservationStatus>()
                .map_err(|_| SqlError::Parse(format!("bad status: {raw}")))?;
            Ok(Command::DecideReservation { id, status })
        }
        "feedback" => Ok(Command::UpdateFeedback {
            id,
            rating: assignment_u8(assignments, "rating")?,
            comment: assignment_string(assignments, "comment")?,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;

    // `DELETE FROM users` detaches the user: rows stay, owner refs go null.
    if table == "users" {
        return Ok(Command::DetachUser {
            user_id: extract_where_user_id(&delete.selection)?,
        });
    }

    let id = extract_where_id(&delete.selection)?;
    match table.as_str() {
        "locations" => Ok(Command::DeleteLocation { id }),
        "rooms" => Ok(Command::DeleteRoom { id }),
        "reservations" => Ok(Command::DeleteReservation { id }),
        "feedback" => Ok(Command::DeleteFeedback { id }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    match table.as_str() {
        "locations" => Ok(Command::SelectLocations),
        "rooms" => {
            let (mut from, mut to) = (None, None);
            if let Some(selection) = &select.selection {
                extract_rooms_filters(selection, &mut from, &mut to);
            }
            Ok(Command::SelectRooms {
                available_from: from,
                available_to: to,
            })
        }
        "reservations" => {
            let mut room_id = None;
            if let Some(selection) = &select.selection {
                extract_room_filter(selection, &mut room_id)?;
            }
            Ok(Command::SelectReservations { room_id })
        }
        "feedback" => {
            let mut room_id = None;
            if let Some(selection) = &select.selection {
                extract_room_filter(selection, &mut room_id)?;
            }
            Ok(Command::SelectFeedback { room_id })
        }
        "availability" => {
            let (mut room_id, mut start, mut end) = (None, None, None);
            if let Some(selection) = &select.selection {
                extract_availability_filters(selection, &mut room_id, &mut start, &mut end)?;
            }
            Ok(Command::SelectAvailability {
                room_id: room_id.ok_or(SqlError::MissingFilter("room_id"))?,
                start: start.ok_or(SqlError::MissingFilter("start"))?,
                end: end.ok_or(SqlError::MissingFilter("end"))?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// Availability bounds on the rooms listing are best-effort: a bound
/// that does not parse is dropped rather than rejected, and the engine
/// treats a half-specified window as no filter at all.
fn extract_rooms_filters(expr: &Expr, from: &mut Option<Ms>, to: &mut Option<Ms>) {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                extract_rooms_filters(left, from, to);
                extract_rooms_filters(right, from, to);
            }
            ast::BinaryOperator::Eq => match expr_column_name(left).as_deref() {
                Some("available_from") => *from = parse_ms(right).ok(),
                Some("available_to") => *to = parse_ms(right).ok(),
                _ => {}
            },
            _ => {}
        }
    }
}

fn extract_room_filter(expr: &Expr, room_id: &mut Option<Ulid>) -> Result<(), SqlError> {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                extract_room_filter(left, room_id)?;
                extract_room_filter(right, room_id)?;
            }
            ast::BinaryOperator::Eq => {
                if expr_column_name(left).as_deref() == Some("room_id") {
                    *room_id = Some(parse_ulid_expr(right)?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn extract_availability_filters(
    expr: &Expr,
    room_id: &mut Option<Ulid>,
    start: &mut Option<Ms>,
    end: &mut Option<Ms>,
) -> Result<(), SqlError> {
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            ast::BinaryOperator::And => {
                extract_availability_filters(left, room_id, start, end)?;
                extract_availability_filters(right, room_id, start, end)?;
            }
            ast::BinaryOperator::Eq => match expr_column_name(left).as_deref() {
                Some("room_id") => *room_id = Some(parse_ulid_expr(right)?),
                Some("start") => *start = Some(parse_ms(right)?),
                Some("end") => *end = Some(parse_ms(right)?),
                _ => {}
            },
            ast::BinaryOperator::GtEq => {
                if expr_column_name(left).as_deref() == Some("start") {
                    *start = Some(parse_ms(right)?);
                }
            }
            ast::BinaryOperator::LtEq => {
                if expr_column_name(left).as_deref() == Some("end") {
                    *end = Some(parse_ms(right)?);
                }
            }
            _ => {}
        },
        _ => {}
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.is_empty() {
                return Err(SqlError::Parse("empty VALUES".into()));
            }
            Ok(values.rows[0].clone())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("id") {
                parse_ulid_expr(right)
            } else {
                Err(SqlError::MissingFilter("id"))
            }
        }
        _ => Err(SqlError::MissingFilter("id")),
    }
}

/// User ids are opaque strings, not ULIDs.
fn extract_where_user_id(selection: &Option<Expr>) -> Result<String, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("id") {
                parse_string(right)
            } else {
                Err(SqlError::MissingFilter("id"))
            }
        }
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn assignment_column(a: &ast::Assignment) -> Option<String> {
    match &a.target {
        ast::AssignmentTarget::ColumnName(name) => object_name_last(name),
        _ => None,
    }
}

fn assignment_expr<'a>(
    assignments: &'a [ast::Assignment],
    column: &'static str,
) -> Result<&'a Expr, SqlError> {
    assignments
        .iter()
        .find(|a| assignment_column(a).as_deref() == Some(column))
        .map(|a| &a.value)
        .ok_or(SqlError::MissingAssignment(column))
}

fn assignment_string(
    assignments: &[ast::Assignment],
    column: &'static str,
) -> Result<String, SqlError> {
    parse_string(assignment_expr(assignments, column)?)
}

fn assignment_u32(assignments: &[ast::Assignment], column: &'static str) -> Result<u32, SqlError> {
    parse_u32(assignment_expr(assignments, column)?)
}

fn assignment_u8(assignments: &[ast::Assignment], column: &'static str) -> Result<u8, SqlError> {
    parse_u8(assignment_expr(assignments, column)?)
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_ulid_expr(expr: &Expr) -> Result<Ulid, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) | Value::Number(s, _) => {
                Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    parse_ulid_expr(expr)
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) => Ok(s.clone()),
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

/// ISO-8601 with an explicit UTC offset, e.g. `2026-03-01T09:00:00+00:00`
/// or the `Z` suffix. This is the only place wall-clock text becomes Ms.
fn parse_timestamp(s: &str) -> Result<Ms, SqlError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| SqlError::Parse(format!("bad timestamp {s:?}: {e}")))
}

/// Timestamps arrive as ISO-8601 strings or raw unix milliseconds.
fn parse_ms(expr: &Expr) -> Result<Ms, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            Value::SingleQuotedString(s) => parse_timestamp(s),
            _ => Err(SqlError::Parse(format!("expected timestamp, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_ms(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_i64_expr(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            Value::SingleQuotedString(s) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64_expr(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_i64_expr(expr)?;
    u32::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of u32 range")))
}

fn parse_u8(expr: &Expr) -> Result<u8, SqlError> {
    let v = parse_i64_expr(expr)?;
    u8::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of u8 range")))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    MissingAssignment(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::MissingAssignment(col) => write!(f, "missing assignment: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}
