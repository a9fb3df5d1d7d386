//! # User Service
//!
//! Directory lookups: profiles joined with roles, the role join tables, and
//! assignment views (who drives which car, which cars a manager oversees).
//!
//! The remote store exposes no joins to this client, so a "join" is two
//! round trips: fetch the role rows, then fetch the matching profiles with
//! an `in` filter and stitch the results together here.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use drivelink_core::{Car, DriverAssignment, DriverRecord, ManagerAssignment, ManagerRecord,
    OwnerRecord, Profile, Role, UserAccount};
use drivelink_gateway::{Filter, Gateway, GatewayError};

use crate::error::ClientResult;
use crate::services::{decode, decode_rows, tables};

/// Stateless user-directory operations over the gateway.
#[derive(Clone)]
pub struct UserService {
    gateway: Arc<dyn Gateway>,
}

impl UserService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        UserService { gateway }
    }

    /// One user with profile and role, or `None` when the id is unknown.
    ///
    /// A missing role row falls back to driver rather than failing the
    /// whole lookup; drivers are the accounts most often half-provisioned.
    pub async fn get_user_by_id(&self, user_id: &str) -> ClientResult<Option<UserAccount>> {
        let profile = match self
            .gateway
            .select_single(tables::PROFILES, Filter::new().eq("id", user_id))
            .await
        {
            Ok(row) => decode::<Profile>(row)?,
            Err(GatewayError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let role = match self
            .gateway
            .select_single(tables::ROLES, Filter::new().eq("user_id", user_id))
            .await
        {
            Ok(row) => row
                .get("role")
                .and_then(Value::as_str)
                .and_then(|s| Role::from_str(s).ok())
                .unwrap_or(Role::Driver),
            Err(GatewayError::NotFound { .. }) => Role::Driver,
            Err(err) => return Err(err.into()),
        };

        Ok(Some(UserAccount::from_profile(profile, role)))
    }

    /// Every driver join row, newest first.
    pub async fn get_drivers(&self) -> ClientResult<Vec<DriverRecord>> {
        let rows = self
            .gateway
            .select(tables::DRIVERS, Filter::new().order_desc("created_at"))
            .await?;
        decode_rows(rows)
    }

    /// Every manager join row, newest first.
    pub async fn get_managers(&self) -> ClientResult<Vec<ManagerRecord>> {
        let rows = self
            .gateway
            .select(tables::MANAGERS, Filter::new().order_desc("created_at"))
            .await?;
        decode_rows(rows)
    }

    /// Every owner join row, newest first.
    pub async fn get_owners(&self) -> ClientResult<Vec<OwnerRecord>> {
        let rows = self
            .gateway
            .select(tables::OWNERS, Filter::new().order_desc("created_at"))
            .await?;
        decode_rows(rows)
    }

    /// Every user holding `role`, with profiles attached.
    pub async fn get_users_by_role(&self, role: Role) -> ClientResult<Vec<UserAccount>> {
        debug!(role = %role, "get_users_by_role");

        let role_rows = self
            .gateway
            .select(tables::ROLES, Filter::new().eq("role", role.as_str()))
            .await?;

        let user_ids: Vec<Value> = role_rows
            .iter()
            .filter_map(|row| row.get("user_id").cloned())
            .collect();
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let profile_rows = self
            .gateway
            .select(tables::PROFILES, Filter::new().is_in("id", user_ids))
            .await?;
        let profiles: Vec<Profile> = decode_rows(profile_rows)?;

        Ok(profiles
            .into_iter()
            .map(|profile| UserAccount::from_profile(profile, role))
            .collect())
    }

    /// The car a driver is currently assigned to, with the assignment row.
    pub async fn get_driver_with_car(
        &self,
        driver_user_id: &str,
    ) -> ClientResult<Option<(DriverAssignment, Car)>> {
        let driver = match self
            .gateway
            .select_single(tables::DRIVERS, Filter::new().eq("user_id", driver_user_id))
            .await
        {
            Ok(row) => decode::<DriverRecord>(row)?,
            Err(GatewayError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let assignment = match self
            .gateway
            .select_single(
                tables::CAR_DRIVER,
                Filter::new()
                    .eq("driver_id", driver.id)
                    .is_null("unassigned_at"),
            )
            .await
        {
            Ok(row) => decode::<DriverAssignment>(row)?,
            Err(GatewayError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let car = match self
            .gateway
            .select_single(tables::CARS, Filter::new().eq("id", assignment.car_id.clone()))
            .await
        {
            Ok(row) => decode::<Car>(row)?,
            // The car was deleted out from under the assignment
            Err(GatewayError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some((assignment, car)))
    }

    /// Every car a manager oversees, with the assignment rows.
    pub async fn get_manager_with_cars(
        &self,
        manager_user_id: &str,
    ) -> ClientResult<Vec<(ManagerAssignment, Car)>> {
        let manager = match self
            .gateway
            .select_single(tables::MANAGERS, Filter::new().eq("user_id", manager_user_id))
            .await
        {
            Ok(row) => decode::<ManagerRecord>(row)?,
            Err(GatewayError::NotFound { .. }) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let assignment_rows = self
            .gateway
            .select(tables::CAR_MANAGER, Filter::new().eq("manager_id", manager.id))
            .await?;
        let assignments: Vec<ManagerAssignment> = decode_rows(assignment_rows)?;

        let mut result = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            match self
                .gateway
                .select_single(tables::CARS, Filter::new().eq("id", assignment.car_id.clone()))
                .await
            {
                Ok(row) => result.push((assignment, decode::<Car>(row)?)),
                // Skip assignments whose car has since been deleted
                Err(GatewayError::NotFound { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(result)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
