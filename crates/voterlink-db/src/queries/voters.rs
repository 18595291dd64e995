//! Voter query functions.
//!
//! These operate on already-normalized [`VoterRecord`]s; derived fields are
//! the caller's responsibility (see [`crate::normalize`]).

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use voterlink_types::{Address, Demographics, Gender, RegistrationStatus, VoterRecord};

use crate::{constraint_or, DbError, Result};

const SELECT_COLUMNS: &str = "SELECT id, voter_id, first_name, last_name, full_name,
        phone_number, email, street, ward, district, constituency, pincode,
        age, gender, occupation, education, registration_status, telegram_user_id,
        created_at, updated_at, synced, last_synced_at
 FROM voters";

/// Insert a normalized record, returning the assigned id.
pub fn insert(conn: &Connection, record: &VoterRecord) -> Result<i64> {
    let demographics = record.demographics.clone().unwrap_or_default();
    conn.execute(
        "INSERT INTO voters
         (voter_id, first_name, last_name, full_name, phone_number, email,
          street, ward, district, constituency, pincode,
          age, gender, occupation, education,
          registration_status, telegram_user_id,
          created_at, updated_at, synced, last_synced_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                 ?16, ?17, ?18, ?19, ?20, ?21)",
        rusqlite::params![
            record.voter_id,
            record.first_name,
            record.last_name,
            record.full_name,
            record.phone_number,
            record.email,
            record.address.street,
            record.address.ward,
            record.address.district,
            record.address.constituency,
            record.address.pincode,
            demographics.age,
            demographics.gender.map(|g| g.as_str()),
            demographics.occupation,
            demographics.education,
            record.registration_status.as_str(),
            record.telegram_user_id,
            record.created_at as i64,
            record.updated_at as i64,
            record.synced,
            record.last_synced_at.map(|t| t as i64),
        ],
    )
    .map_err(constraint_or)?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite every column of an existing record.
pub fn replace(conn: &Connection, record: &VoterRecord) -> Result<()> {
    let demographics = record.demographics.clone().unwrap_or_default();
    let changed = conn
        .execute(
            "UPDATE voters SET
                voter_id = ?2, first_name = ?3, last_name = ?4, full_name = ?5,
                phone_number = ?6, email = ?7,
                street = ?8, ward = ?9, district = ?10, constituency = ?11, pincode = ?12,
                age = ?13, gender = ?14, occupation = ?15, education = ?16,
                registration_status = ?17, telegram_user_id = ?18,
                updated_at = ?19, synced = ?20
             WHERE id = ?1",
            rusqlite::params![
                record.id,
                record.voter_id,
                record.first_name,
                record.last_name,
                record.full_name,
                record.phone_number,
                record.email,
                record.address.street,
                record.address.ward,
                record.address.district,
                record.address.constituency,
                record.address.pincode,
                demographics.age,
                demographics.gender.map(|g| g.as_str()),
                demographics.occupation,
                demographics.education,
                record.registration_status.as_str(),
                record.telegram_user_id,
                record.updated_at as i64,
                record.synced,
            ],
        )
        .map_err(constraint_or)?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("voter #{}", record.id)));
    }
    Ok(())
}

/// Get a voter by local id.
pub fn get(conn: &Connection, id: i64) -> Result<Option<VoterRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Get a voter by external voter id.
pub fn get_by_voter_id(conn: &Connection, voter_id: &str) -> Result<Option<VoterRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE voter_id = ?1 ORDER BY id LIMIT 1");
    Ok(conn.query_row(&sql, [voter_id], from_row).optional()?)
}

/// Get the first voter linked to a platform user.
pub fn get_by_telegram_user(conn: &Connection, user_id: i64) -> Result<Option<VoterRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE telegram_user_id = ?1 ORDER BY id LIMIT 1");
    Ok(conn.query_row(&sql, [user_id], from_row).optional()?)
}

/// List all voters in insertion order.
pub fn list(conn: &Connection) -> Result<Vec<VoterRecord>> {
    query(conn, &format!("{SELECT_COLUMNS} ORDER BY id"), [])
}

/// List voters with the given registration status.
pub fn list_by_status(conn: &Connection, status: RegistrationStatus) -> Result<Vec<VoterRecord>> {
    query(
        conn,
        &format!("{SELECT_COLUMNS} WHERE registration_status = ?1 ORDER BY id"),
        [status.as_str()],
    )
}

/// List voters in a ward.
pub fn list_by_ward(conn: &Connection, ward: &str) -> Result<Vec<VoterRecord>> {
    query(
        conn,
        &format!("{SELECT_COLUMNS} WHERE ward = ?1 ORDER BY id"),
        [ward],
    )
}

/// List voters in a district.
pub fn list_by_district(conn: &Connection, district: &str) -> Result<Vec<VoterRecord>> {
    query(
        conn,
        &format!("{SELECT_COLUMNS} WHERE district = ?1 ORDER BY id"),
        [district],
    )
}

/// Case-insensitive substring search on the full name.
///
/// Uses `fold_case`, registered on every connection by [`crate::open`].
pub fn search_name(conn: &Connection, needle: &str) -> Result<Vec<VoterRecord>> {
    query(
        conn,
        &format!(
            "{SELECT_COLUMNS} WHERE instr(fold_case(full_name), fold_case(?1)) > 0 ORDER BY id"
        ),
        [needle],
    )
}

/// List voters not yet confirmed by a sync.
pub fn list_unsynced(conn: &Connection) -> Result<Vec<VoterRecord>> {
    query(
        conn,
        &format!("{SELECT_COLUMNS} WHERE synced = 0 ORDER BY id"),
        [],
    )
}

/// Set the sync flag and stamp the sync time. Nothing else changes.
pub fn mark_synced(conn: &Connection, id: i64, synced_at: u64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE voters SET synced = 1, last_synced_at = ?2 WHERE id = ?1",
        rusqlite::params![id, synced_at as i64],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("voter #{id}")));
    }
    Ok(())
}

/// Delete a voter. Returns whether a row was removed.
pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM voters WHERE id = ?1", [id])?;
    Ok(changed > 0)
}

/// Number of stored voters.
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM voters", [], |row| row.get(0))?;
    Ok(n as u64)
}

fn query<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<VoterRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<VoterRecord> {
    let gender = row
        .get::<_, Option<String>>(13)?
        .map(|g| g.parse::<Gender>().map_err(|e| conversion(13, e)))
        .transpose()?;
    let demographics = Demographics {
        age: row.get(12)?,
        gender,
        occupation: row.get(14)?,
        education: row.get(15)?,
    };
    let status: String = row.get(16)?;

    Ok(VoterRecord {
        id: row.get(0)?,
        voter_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        full_name: row.get(4)?,
        phone_number: row.get(5)?,
        email: row.get(6)?,
        address: Address {
            street: row.get(7)?,
            ward: row.get(8)?,
            district: row.get(9)?,
            constituency: row.get(10)?,
            pincode: row.get(11)?,
        },
        demographics: (!demographics.is_empty()).then_some(demographics),
        registration_status: status
            .parse::<RegistrationStatus>()
            .map_err(|e| conversion(16, e))?,
        telegram_user_id: row.get(17)?,
        created_at: row.get::<_, i64>(18)? as u64,
        updated_at: row.get::<_, i64>(19)? as u64,
        synced: row.get(20)?,
        last_synced_at: row.get::<_, Option<i64>>(21)?.map(|t| t as u64),
    })
}

fn conversion(idx: usize, err: voterlink_types::UnknownVariant) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}
