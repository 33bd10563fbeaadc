//! Client records, case assignments and the searches over them.

use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::db::{
    CaseUpdate, Client, ClientCase, ClientCaseWithWorker, ClientFields, ClientListResponse,
    ClientSearchCriteria, DbPool, FieldValue, ServiceFlags, SparseFilter, UserRole,
};

use super::auth::require_role;
use super::validation::{
    validate_case_update, validate_client_fields, validate_min_rate, validate_pagination,
    validate_search_criteria,
};
use super::{Identity, ServiceError};

/// Clients joined to their case rows; callers append conditions on `cc`
const CLIENTS_WITH_CASES: &str =
    "SELECT DISTINCT c.* FROM clients c JOIN client_cases cc ON cc.client_id = c.id";

pub struct ClientService {
    db: DbPool,
}

impl ClientService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create_client(
        &self,
        caller: &Identity,
        fields: ClientFields,
    ) -> Result<Client, ServiceError> {
        require_role(caller, UserRole::Admin)?;
        validate_client_fields(&fields)?;

        let assignments = fields.assignments();
        let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO clients");
        if assignments.is_empty() {
            qb.push(" DEFAULT VALUES");
        } else {
            qb.push(" (");
            let mut columns = qb.separated(", ");
            for (column, _) in &assignments {
                columns.push(*column);
            }
            qb.push(") VALUES (");
            for (i, (_, value)) in assignments.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                value.push_bind(&mut qb);
            }
            qb.push(")");
        }

        let id = qb.build().execute(&self.db).await?.last_insert_rowid();
        info!(client_id = id, created_by = %caller.username, "Client created");

        self.get_client(id).await
    }

    pub async fn get_client(&self, id: i64) -> Result<Client, ServiceError> {
        self.find_client(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Client {} not found", id)))
    }

    pub async fn list_clients(&self, skip: i64, limit: i64) -> Result<ClientListResponse, ServiceError> {
        validate_pagination(skip, limit)?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.db)
            .await?;

        let clients = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.db)
        .await?;

        Ok(ClientListResponse { clients, total })
    }

    /// Clients matching every supplied criterion
    pub async fn search_by_criteria(
        &self,
        caller: &Identity,
        criteria: &ClientSearchCriteria,
    ) -> Result<Vec<Client>, ServiceError> {
        require_role(caller, UserRole::Admin)?;
        validate_search_criteria(criteria)?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM clients");
        criteria.to_filter().push_conditions(&mut qb, None, false);
        qb.push(" ORDER BY id");

        let clients = qb.build_query_as::<Client>().fetch_all(&self.db).await?;
        Ok(clients)
    }

    /// Clients with at least one case row satisfying every supplied flag.
    ///
    /// With no flags this is every client that has a case.
    pub async fn search_by_services(
        &self,
        caller: &Identity,
        flags: &ServiceFlags,
    ) -> Result<Vec<Client>, ServiceError> {
        require_role(caller, UserRole::Admin)?;
        self.clients_with_cases(flags.to_filter()).await
    }

    /// Every case row of a client, with the assigned worker's name and email
    pub async fn get_client_services(
        &self,
        caller: &Identity,
        client_id: i64,
    ) -> Result<Vec<ClientCaseWithWorker>, ServiceError> {
        require_role(caller, UserRole::Admin)?;
        self.get_client(client_id).await?;

        let cases = sqlx::query_as::<_, ClientCaseWithWorker>(
            r#"
            SELECT cc.*, u.username AS case_worker_username, u.email AS case_worker_email
            FROM client_cases cc
            JOIN users u ON u.id = cc.user_id
            WHERE cc.client_id = ?
            ORDER BY cc.user_id
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        Ok(cases)
    }

    pub async fn search_by_success_rate(
        &self,
        caller: &Identity,
        min_rate: i64,
    ) -> Result<Vec<Client>, ServiceError> {
        require_role(caller, UserRole::Admin)?;
        validate_min_rate(min_rate)?;
        self.clients_with_cases(SparseFilter::new().gte("success_rate", Some(min_rate)))
            .await
    }

    /// Clients assigned to a case worker; unknown workers have none
    pub async fn list_by_case_worker(&self, user_id: i64) -> Result<Vec<Client>, ServiceError> {
        self.clients_with_cases(SparseFilter::new().eq("user_id", Some(user_id)))
            .await
    }

    /// Merge the supplied fields into an existing client
    pub async fn update_client(
        &self,
        caller: &Identity,
        id: i64,
        fields: ClientFields,
    ) -> Result<Client, ServiceError> {
        require_role(caller, UserRole::Admin)?;
        validate_client_fields(&fields)?;

        let mut tx = self.db.begin().await?;
        let existing: Option<Client> = sqlx::query_as("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let existing =
            existing.ok_or_else(|| ServiceError::not_found(format!("Client {} not found", id)))?;

        let assignments = fields.assignments();
        if assignments.is_empty() {
            return Ok(existing);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE clients SET ");
        push_assignments(&mut qb, &assignments);
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.build().execute(&mut *tx).await?;

        let client: Client = sqlx::query_as("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(client_id = id, updated_by = %caller.username, "Client updated");
        Ok(client)
    }

    /// Merge service flags and the success rate into an existing case
    pub async fn update_case(
        &self,
        caller: &Identity,
        client_id: i64,
        user_id: i64,
        update: CaseUpdate,
    ) -> Result<ClientCase, ServiceError> {
        validate_case_update(&update)?;

        let mut tx = self.db.begin().await?;
        let existing: Option<ClientCase> =
            sqlx::query_as("SELECT * FROM client_cases WHERE client_id = ? AND user_id = ?")
                .bind(client_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let existing = existing.ok_or_else(|| {
            ServiceError::not_found(format!(
                "No case for client {} and case worker {}",
                client_id, user_id
            ))
        })?;

        let assignments = update.assignments();
        if assignments.is_empty() {
            return Ok(existing);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE client_cases SET ");
        push_assignments(&mut qb, &assignments);
        qb.push(" WHERE client_id = ");
        qb.push_bind(client_id);
        qb.push(" AND user_id = ");
        qb.push_bind(user_id);
        qb.build().execute(&mut *tx).await?;

        let case: ClientCase =
            sqlx::query_as("SELECT * FROM client_cases WHERE client_id = ? AND user_id = ?")
                .bind(client_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;

        info!(client_id, user_id, updated_by = %caller.username, "Case updated");
        Ok(case)
    }

    /// Update the case the caller is assigned to for `client_id`
    pub async fn update_own_case(
        &self,
        caller: &Identity,
        client_id: i64,
        update: CaseUpdate,
    ) -> Result<ClientCase, ServiceError> {
        self.update_case(caller, client_id, caller.id, update).await
    }

    /// Assign a case worker to a client with every service field empty
    pub async fn create_case_assignment(
        &self,
        caller: &Identity,
        client_id: i64,
        user_id: i64,
    ) -> Result<ClientCase, ServiceError> {
        require_role(caller, UserRole::Admin)?;
        self.get_client(client_id).await?;

        let worker: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        if worker.is_none() {
            return Err(ServiceError::not_found(format!("User {} not found", user_id)));
        }

        let conflict = || {
            ServiceError::Conflict(format!(
                "Client {} is already assigned to case worker {}",
                client_id, user_id
            ))
        };

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT client_id FROM client_cases WHERE client_id = ? AND user_id = ?")
                .bind(client_id)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        if existing.is_some() {
            return Err(conflict());
        }

        let case = sqlx::query_as::<_, ClientCase>(
            "INSERT INTO client_cases (client_id, user_id) VALUES (?, ?) RETURNING *",
        )
        .bind(client_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => conflict(),
            other => other.into(),
        })?;

        info!(client_id, user_id, assigned_by = %caller.username, "Case assigned");
        Ok(case)
    }

    /// Delete a client together with its case rows
    pub async fn delete_client(&self, caller: &Identity, id: i64) -> Result<(), ServiceError> {
        require_role(caller, UserRole::Admin)?;

        let mut tx = self.db.begin().await?;
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(ServiceError::not_found(format!("Client {} not found", id)));
        }

        let cases = sqlx::query("DELETE FROM client_cases WHERE client_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(client_id = id, cases, deleted_by = %caller.username, "Client deleted");
        Ok(())
    }

    async fn find_client(&self, id: i64) -> Result<Option<Client>, ServiceError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(client)
    }

    async fn clients_with_cases(&self, filter: SparseFilter) -> Result<Vec<Client>, ServiceError> {
        let mut qb = QueryBuilder::<Sqlite>::new(CLIENTS_WITH_CASES);
        filter.push_conditions(&mut qb, Some("cc"), false);
        qb.push(" ORDER BY c.id");

        let clients = qb.build_query_as::<Client>().fetch_all(&self.db).await?;
        Ok(clients)
    }
}

fn push_assignments(qb: &mut QueryBuilder<'_, Sqlite>, assignments: &[(&'static str, FieldValue)]) {
    for (i, (column, value)) in assignments.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(*column);
        qb.push(" = ");
        value.push_bind(qb);
    }
}
