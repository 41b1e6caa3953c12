use crate::Database;
use crate::models::{
    AdminRow, MetricsRow, NewNotificationLog, NewScreening, NotificationLogRow,
    NotificationStatsRow, RegisterOutcome, ScreeningRow, UserRow,
};
use anyhow::Result;
use nutrisaur_types::models::{
    CRITICAL_MUAC_CM, HIGH_RISK_THRESHOLD, LOW_BMI_THRESHOLD, LocationFilter,
    MODERATE_RISK_THRESHOLD, SAM_WHZ_THRESHOLD,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};

const SCREENING_COLUMNS: &str = "id, name, user_email, age, barangay, risk_score, bmi, muac, \
     whz_score, dietary_diversity_score, created_at";

const NOTIFICATION_COLUMNS: &str = "id, event_id, notification_type, target_type, target_value, \
     tokens_sent, success, error_message, created_at";

/// Which column a login identifier is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginKey {
    Email,
    Username,
}

impl Database {
    // -- Users --

    pub fn get_user_by_login(&self, login: &str, key: LoginKey) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, login, key))
    }

    pub fn touch_user_login(&self, user_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = datetime('now') WHERE user_id = ?1",
                [user_id],
            )?;
            Ok(())
        })
    }

    /// Register a user in one transaction: duplicate check, insert, then
    /// `issue_session` with the new id. If `issue_session` fails the insert
    /// is rolled back.
    pub fn register_user<T, F>(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        issue_session: F,
    ) -> Result<RegisterOutcome<T>>
    where
        F: FnOnce(i64) -> Result<T>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT user_id FROM users WHERE username = ?1 OR email = ?2 LIMIT 1",
                    (username, email),
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                // Dropping the transaction rolls it back
                return Ok(RegisterOutcome::Duplicate);
            }

            tx.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            let user_id = tx.last_insert_rowid();

            let session = issue_session(user_id)?;

            tx.commit()?;
            Ok(RegisterOutcome::Created { user_id, session })
        })
    }

    // -- Admins --

    pub fn create_admin(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO admin (username, email, password, role) VALUES (?1, ?2, ?3, ?4)",
                (username, email, password_hash, role),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_admin_by_login(&self, login: &str, key: LoginKey) -> Result<Option<AdminRow>> {
        self.with_conn(|conn| query_admin(conn, login, key))
    }

    pub fn touch_admin_login(&self, admin_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE admin SET last_login = datetime('now') WHERE admin_id = ?1",
                [admin_id],
            )?;
            Ok(())
        })
    }

    // -- Screenings --

    pub fn insert_screening(&self, s: &NewScreening) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO user_preferences
                    (user_email, name, age, gender, barangay, municipality, bmi, muac, whz_score,
                     risk_score, dietary_diversity_score, swelling, weight_loss, feeding_behavior)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    s.user_email,
                    s.name,
                    s.age,
                    s.gender,
                    s.barangay,
                    s.municipality,
                    s.bmi,
                    s.muac,
                    s.whz_score,
                    s.risk_score,
                    s.dietary_diversity_score,
                    s.swelling,
                    s.weight_loss,
                    s.feeding_behavior,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Aggregate screening metrics for a location. All counting happens in SQL.
    pub fn community_metrics(&self, filter: &LocationFilter) -> Result<MetricsRow> {
        self.with_conn(|conn| query_metrics(conn, filter))
    }

    /// Screenings matching any severity predicate, worst first.
    pub fn critical_screenings(
        &self,
        filter: &LocationFilter,
        limit: u32,
    ) -> Result<Vec<ScreeningRow>> {
        self.with_conn(|conn| {
            let mut params = Vec::new();
            let mut sql = format!("SELECT {} FROM user_preferences WHERE ", SCREENING_COLUMNS);
            if let Some(clause) = location_clause(filter, &mut params) {
                sql.push_str(clause);
                sql.push_str(" AND ");
            }
            sql.push_str(&format!(
                "(risk_score >= {} OR bmi < {} OR muac < {} OR whz_score < {})
                 ORDER BY risk_score DESC, created_at DESC, id DESC
                 LIMIT ?",
                HIGH_RISK_THRESHOLD, LOW_BMI_THRESHOLD, CRITICAL_MUAC_CM, SAM_WHZ_THRESHOLD
            ));
            params.push(Value::Integer(i64::from(limit)));

            query_screenings(conn, &sql, params)
        })
    }

    /// Highest-risk screenings for the recommendation rules, filtered by exact
    /// barangay and/or municipality.
    pub fn recommendation_screenings(
        &self,
        barangay: Option<&str>,
        municipality: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ScreeningRow>> {
        self.with_conn(|conn| {
            let mut params = Vec::new();
            let mut sql = format!("SELECT {} FROM user_preferences WHERE 1=1", SCREENING_COLUMNS);
            if let Some(b) = barangay {
                sql.push_str(" AND barangay = ?");
                params.push(Value::Text(b.to_string()));
            }
            if let Some(m) = municipality {
                sql.push_str(" AND municipality = ?");
                params.push(Value::Text(m.to_string()));
            }
            sql.push_str(" ORDER BY risk_score DESC, created_at DESC, id DESC LIMIT ?");
            params.push(Value::Integer(i64::from(limit)));

            query_screenings(conn, &sql, params)
        })
    }

    // -- Notification logs --

    pub fn insert_notification_log(&self, log: &NewNotificationLog) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notification_logs
                    (event_id, notification_type, target_type, target_value,
                     tokens_sent, success, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    log.event_id,
                    log.notification_type,
                    log.target_type,
                    log.target_value,
                    log.tokens_sent,
                    log.success,
                    log.error_message,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn recent_notification_logs(&self, limit: u32) -> Result<Vec<NotificationLogRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM notification_logs ORDER BY created_at DESC, id DESC LIMIT ?1",
                NOTIFICATION_COLUMNS
            ))?;

            let rows = stmt
                .query_map([limit], map_notification_log)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_notification_log(&self, id: i64) -> Result<Option<NotificationLogRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM notification_logs WHERE id = ?1", NOTIFICATION_COLUMNS),
                [id],
                map_notification_log,
            )
            .optional()
        })
    }

    pub fn notification_stats(&self) -> Result<NotificationStatsRow> {
        self.with_conn(|conn| {
            let totals: (i64, i64, i64, i64, i64) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(tokens_sent), 0),
                        COALESCE(SUM(CASE WHEN created_at >= datetime('now', '-1 day')
                                     THEN 1 ELSE 0 END), 0)
                 FROM notification_logs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )?;
            let (total, successful, failed, total_tokens_sent, last_24h) = totals;

            Ok(NotificationStatsRow {
                total,
                successful,
                failed,
                by_type: count_grouped(conn, "notification_type")?,
                by_target: count_grouped(conn, "target_type")?,
                total_tokens_sent,
                last_24h,
            })
        })
    }
}

/// Append the location predicate's parameter and return its SQL fragment.
fn location_clause(filter: &LocationFilter, params: &mut Vec<Value>) -> Option<&'static str> {
    match filter {
        LocationFilter::All => None,
        LocationFilter::Barangay(barangay) => {
            params.push(Value::Text(barangay.clone()));
            Some("barangay = ?")
        }
        LocationFilter::Municipality(municipality) => {
            params.push(Value::Text(format!("%{}%", municipality)));
            Some("barangay LIKE ?")
        }
    }
}

fn query_metrics(conn: &Connection, filter: &LocationFilter) -> Result<MetricsRow> {
    let mut params = Vec::new();
    let clause = location_clause(filter, &mut params);

    let mut sql = format!(
        "SELECT COUNT(*),
                AVG(risk_score),
                COALESCE(SUM(CASE WHEN risk_score >= {high} THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN risk_score >= {moderate} AND risk_score < {high}
                             THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN risk_score < {moderate} THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN whz_score < {sam} THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN muac < {muac} THEN 1 ELSE 0 END), 0),
                COUNT(DISTINCT barangay)
         FROM user_preferences",
        high = HIGH_RISK_THRESHOLD,
        moderate = MODERATE_RISK_THRESHOLD,
        sam = SAM_WHZ_THRESHOLD,
        muac = CRITICAL_MUAC_CM,
    );
    if let Some(clause) = clause {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }

    let mut row = conn.query_row(&sql, params_from_iter(params.iter()), |row| {
        Ok(MetricsRow {
            total_screenings: row.get(0)?,
            avg_risk_score: row.get(1)?,
            high_risk: row.get(2)?,
            moderate_risk: row.get(3)?,
            low_risk: row.get(4)?,
            sam_cases: row.get(5)?,
            critical_muac: row.get(6)?,
            barangays_covered: row.get(7)?,
            screenings_this_week: 0,
        })
    })?;

    let mut recent_sql =
        "SELECT COUNT(*) FROM user_preferences WHERE created_at >= datetime('now', '-7 days')".to_string();
    if let Some(clause) = clause {
        recent_sql.push_str(" AND ");
        recent_sql.push_str(clause);
    }
    row.screenings_this_week =
        conn.query_row(&recent_sql, params_from_iter(params.iter()), |r| r.get(0))?;

    Ok(row)
}

fn query_screenings(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Vec<ScreeningRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), map_screening)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_screening(row: &Row<'_>) -> rusqlite::Result<ScreeningRow> {
    Ok(ScreeningRow {
        id: row.get(0)?,
        name: row.get(1)?,
        user_email: row.get(2)?,
        age: row.get(3)?,
        barangay: row.get(4)?,
        risk_score: row.get(5)?,
        bmi: row.get(6)?,
        muac: row.get(7)?,
        whz_score: row.get(8)?,
        dietary_diversity_score: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn map_notification_log(row: &Row<'_>) -> rusqlite::Result<NotificationLogRow> {
    Ok(NotificationLogRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        notification_type: row.get(2)?,
        target_type: row.get(3)?,
        target_value: row.get(4)?,
        tokens_sent: row.get(5)?,
        success: row.get(6)?,
        error_message: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn count_grouped(conn: &Connection, column: &'static str) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "SELECT {col}, COUNT(*) FROM notification_logs GROUP BY {col} ORDER BY {col}",
        col = column
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_user(conn: &Connection, login: &str, key: LoginKey) -> Result<Option<UserRow>> {
    let sql = match key {
        LoginKey::Email => "SELECT user_id, username, email, password FROM users WHERE email = ?1",
        LoginKey::Username => {
            "SELECT user_id, username, email, password FROM users WHERE username = ?1"
        }
    };

    let row = conn
        .query_row(sql, [login], |row| {
            Ok(UserRow {
                user_id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_admin(conn: &Connection, login: &str, key: LoginKey) -> Result<Option<AdminRow>> {
    let sql = match key {
        LoginKey::Email => {
            "SELECT admin_id, username, email, password, role FROM admin WHERE email = ?1"
        }
        LoginKey::Username => {
            "SELECT admin_id, username, email, password, role FROM admin WHERE username = ?1"
        }
    };

    let row = conn
        .query_row(sql, [login], |row| {
            Ok(AdminRow {
                admin_id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn screening(barangay: &str, risk: i64) -> NewScreening {
        NewScreening {
            barangay: barangay.to_string(),
            risk_score: risk,
            ..Default::default()
        }
    }

    fn user_count(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn register_then_lookup_by_either_key() {
        let db = Database::open_in_memory().unwrap();
        let outcome = db.register_user("ana", "ana@example.com", "hash", |id| Ok(id)).unwrap();
        let RegisterOutcome::Created { user_id, session } = outcome else {
            panic!("expected a new user");
        };
        assert_eq!(user_id, session);

        let by_name = db.get_user_by_login("ana", LoginKey::Username).unwrap().unwrap();
        let by_mail = db.get_user_by_login("ana@example.com", LoginKey::Email).unwrap().unwrap();
        assert_eq!(by_name.user_id, by_mail.user_id);
        assert!(db.get_user_by_login("ana", LoginKey::Email).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_or_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.register_user("ana", "ana@example.com", "h", |_| Ok(())).unwrap();

        let same_name = db.register_user("ana", "other@example.com", "h", |_| Ok(())).unwrap();
        assert!(matches!(same_name, RegisterOutcome::Duplicate));

        let same_mail = db.register_user("bea", "ana@example.com", "h", |_| Ok(())).unwrap();
        assert!(matches!(same_mail, RegisterOutcome::Duplicate));

        assert_eq!(user_count(&db), 1);
    }

    #[test]
    fn failed_session_issue_rolls_back_insert() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<RegisterOutcome<()>> =
            db.register_user("ana", "ana@example.com", "h", |_| Err(anyhow!("signing failed")));
        assert!(result.is_err());
        assert_eq!(user_count(&db), 0);
    }

    #[test]
    fn admin_lookup_and_touch() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_admin("root", "root@example.com", "h", "super_admin").unwrap();
        let admin = db.get_admin_by_login("root@example.com", LoginKey::Email).unwrap().unwrap();
        assert_eq!(admin.admin_id, id);
        assert_eq!(admin.role, "super_admin");
        db.touch_admin_login(id).unwrap();

        let last_login: Option<String> = db
            .with_conn(|conn| {
                let sql = "SELECT last_login FROM admin WHERE admin_id = ?1";
                Ok(conn.query_row(sql, [id], |r| r.get(0))?)
            })
            .unwrap();
        assert!(last_login.is_some());
    }

    #[test]
    fn metrics_partition_by_risk() {
        let db = Database::open_in_memory().unwrap();
        let rows = [
            ("Orion", 10),
            ("Orion", 30),
            ("Orion", 69),
            ("Orion", 70),
            ("Bangkal", 95),
        ];
        for (barangay, risk) in rows {
            db.insert_screening(&screening(barangay, risk)).unwrap();
        }

        let all = db.community_metrics(&LocationFilter::All).unwrap();
        assert_eq!(all.total_screenings, 5);
        assert_eq!((all.high_risk, all.moderate_risk, all.low_risk), (2, 2, 1));
        assert_eq!(all.barangays_covered, 2);
        assert_eq!(all.screenings_this_week, 5);

        let orion = db.community_metrics(&LocationFilter::Barangay("Orion".into())).unwrap();
        assert_eq!(orion.total_screenings, 4);
        assert_eq!(orion.avg_risk_score, Some(44.75));
    }

    #[test]
    fn metrics_on_empty_table() {
        let db = Database::open_in_memory().unwrap();
        let m = db.community_metrics(&LocationFilter::All).unwrap();
        assert_eq!(m.total_screenings, 0);
        assert_eq!(m.avg_risk_score, None);
        assert_eq!(m.high_risk, 0);
    }

    #[test]
    fn metrics_week_window_excludes_old_rows() {
        let db = Database::open_in_memory().unwrap();
        let old = db.insert_screening(&screening("Orion", 40)).unwrap();
        db.insert_screening(&screening("Orion", 40)).unwrap();
        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE user_preferences SET created_at = datetime('now', '-10 days') WHERE id = ?1",
                [old],
            )?;
            Ok(())
        })
        .unwrap();

        let m = db.community_metrics(&LocationFilter::All).unwrap();
        assert_eq!(m.total_screenings, 2);
        assert_eq!(m.screenings_this_week, 1);
    }

    #[test]
    fn municipality_filter_uses_substring_match() {
        let db = Database::open_in_memory().unwrap();
        db.insert_screening(&screening("Cupang, Balanga", 50)).unwrap();
        db.insert_screening(&screening("Tuyo, Balanga", 50)).unwrap();
        db.insert_screening(&screening("Orion", 50)).unwrap();

        let m = db
            .community_metrics(&LocationFilter::Municipality("Balanga".into()))
            .unwrap();
        assert_eq!(m.total_screenings, 2);
    }

    #[test]
    fn critical_screenings_select_any_predicate_and_order() {
        let db = Database::open_in_memory().unwrap();
        db.insert_screening(&screening("Orion", 20)).unwrap();
        let low_bmi = NewScreening {
            bmi: Some(15.0),
            ..screening("Orion", 20)
        };
        let thin_arm = NewScreening {
            muac: Some(11.0),
            ..screening("Orion", 40)
        };
        let wasted = NewScreening {
            whz_score: Some(-3.2),
            ..screening("Orion", 10)
        };
        for s in [&low_bmi, &thin_arm, &wasted] {
            db.insert_screening(s).unwrap();
        }
        db.insert_screening(&screening("Orion", 85)).unwrap();

        let rows = db.critical_screenings(&LocationFilter::All, 10).unwrap();
        let risks: Vec<i64> = rows.iter().map(|r| r.risk_score).collect();
        assert_eq!(risks, vec![85, 40, 20, 10]);
    }

    #[test]
    fn critical_screenings_respect_limit() {
        let db = Database::open_in_memory().unwrap();
        for _ in 0..15 {
            db.insert_screening(&screening("Orion", 90)).unwrap();
        }
        assert_eq!(db.critical_screenings(&LocationFilter::All, 10).unwrap().len(), 10);
    }

    #[test]
    fn recommendation_rows_filter_exactly() {
        let db = Database::open_in_memory().unwrap();
        db.insert_screening(&NewScreening {
            municipality: Some("Balanga".into()),
            ..screening("Cupang", 60)
        })
        .unwrap();
        db.insert_screening(&screening("Cupang", 20)).unwrap();

        assert_eq!(db.recommendation_screenings(None, None, 50).unwrap().len(), 2);
        let scoped = db
            .recommendation_screenings(Some("Cupang"), Some("Balanga"), 50)
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert!(db.recommendation_screenings(Some("Cup"), None, 50).unwrap().is_empty());
    }

    #[test]
    fn notification_logs_roundtrip_and_stats() {
        let db = Database::open_in_memory().unwrap();
        let entries = [
            ("critical_alert", true, 12),
            ("critical_alert", false, 0),
            ("event", true, 3),
        ];
        for (kind, success, tokens) in entries {
            db.insert_notification_log(&NewNotificationLog {
                notification_type: kind.into(),
                target_type: "barangay".into(),
                target_value: Some("Orion".into()),
                tokens_sent: tokens,
                success,
                error_message: (!success).then(|| "no tokens".to_string()),
                ..Default::default()
            })
            .unwrap();
        }

        let logs = db.recent_notification_logs(2).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].notification_type, "event");

        let first = db.get_notification_log(logs[1].id).unwrap().unwrap();
        assert_eq!(first.error_message.as_deref(), Some("no tokens"));
        assert!(db.get_notification_log(9999).unwrap().is_none());

        let stats = db.notification_stats().unwrap();
        assert_eq!((stats.total, stats.successful, stats.failed), (3, 2, 1));
        assert_eq!(stats.total_tokens_sent, 15);
        assert_eq!(stats.last_24h, 3);
        assert_eq!(
            stats.by_type,
            vec![("critical_alert".to_string(), 2), ("event".to_string(), 1)]
        );
        assert_eq!(stats.by_target, vec![("barangay".to_string(), 3)]);
    }
}
