//! # Car Service
//!
//! CRUD and assignment operations for fleet vehicles.
//!
//! ## Driver Assignment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    assign_driver(car, driver)                           │
//! │                                                                         │
//! │  1. resolve driver user id → driver record id                          │
//! │  2. close open assignments:  unassigned_at = now WHERE car_id = car    │
//! │                              AND unassigned_at IS NULL                 │
//! │  3. re-check: any row still open? → refuse (concurrent assigner won)   │
//! │  4. insert new assignment:   assigned_at = now, unassigned_at = null   │
//! │                                                                         │
//! │  The close-then-open pair is two writes, not a transaction. A crash    │
//! │  between them can leave a car with zero active drivers (acceptable);   │
//! │  the re-check in step 3 keeps a concurrent race from producing two.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use drivelink_core::{validation, Car, CarStatus, DriverAssignment, DriverRecord, ManagerAssignment,
    ManagerRecord, OwnerRecord};
use drivelink_gateway::{Filter, Gateway, GatewayError};

use crate::error::{ClientError, ClientResult};
use crate::services::{decode, decode_rows, tables};

// =============================================================================
// Inputs
// =============================================================================

/// Input for [`CarService::create_car`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCar {
    pub plate_no: String,
    pub libre_no: String,
    /// Owner record id (not the owner's user id).
    pub owner_id: String,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub fuel_type: Option<String>,
    pub status: CarStatus,
}

/// Fields that [`CarService::update_car`] may change. `None` = unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarPatch {
    pub plate_no: Option<String>,
    pub libre_no: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub fuel_type: Option<String>,
    pub status: Option<CarStatus>,
}

// =============================================================================
// Car Service
// =============================================================================

/// Stateless car operations over the gateway.
#[derive(Clone)]
pub struct CarService {
    gateway: Arc<dyn Gateway>,
}

impl CarService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        CarService { gateway }
    }

    /// Fetches every car, newest first.
    pub async fn get_all_cars(&self) -> ClientResult<Vec<Car>> {
        let rows = self
            .gateway
            .select(tables::CARS, Filter::new().order_desc("created_at"))
            .await?;
        decode_rows(rows)
    }

    /// Fetches one car, or `None` when the id is unknown.
    pub async fn get_car_by_id(&self, car_id: &str) -> ClientResult<Option<Car>> {
        match self
            .gateway
            .select_single(tables::CARS, Filter::new().eq("id", car_id))
            .await
        {
            Ok(row) => Ok(Some(decode(row)?)),
            Err(GatewayError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetches the cars of one owner, resolving user id → owner record first.
    pub async fn get_cars_by_owner(&self, owner_user_id: &str) -> ClientResult<Vec<Car>> {
        let owner_row = self
            .gateway
            .select_single(tables::OWNERS, Filter::new().eq("user_id", owner_user_id))
            .await?;
        let owner: OwnerRecord = decode(owner_row)?;

        let rows = self
            .gateway
            .select(
                tables::CARS,
                Filter::new().eq("owner_id", owner.id).order_desc("created_at"),
            )
            .await?;
        decode_rows(rows)
    }

    /// Registers a new car.
    pub async fn create_car(&self, new_car: &NewCar) -> ClientResult<Car> {
        validation::validate_plate_no(&new_car.plate_no)?;
        if new_car.libre_no.trim().is_empty() {
            return Err(drivelink_core::ValidationError::Required {
                field: "libre_no".to_string(),
            }
            .into());
        }
        if let Some(year) = new_car.year {
            validation::validate_year(year)?;
        }

        debug!(plate_no = %new_car.plate_no, "create_car");

        let row = json!({
            "plate_no": new_car.plate_no,
            "libre_no": new_car.libre_no,
            "owner_id": new_car.owner_id,
            "model": new_car.model,
            "year": new_car.year,
            "color": new_car.color,
            "fuel_type": new_car.fuel_type,
            "status": new_car.status,
            "created_at": Utc::now(),
        });

        let stored = self.gateway.insert(tables::CARS, row).await?;
        decode(stored)
    }

    /// Applies a patch and returns the car as stored.
    pub async fn update_car(&self, car_id: &str, patch: &CarPatch) -> ClientResult<Car> {
        debug!(car_id = %car_id, "update_car");

        let mut fields = Map::new();
        if let Some(plate_no) = &patch.plate_no {
            validation::validate_plate_no(plate_no)?;
            fields.insert("plate_no".to_string(), json!(plate_no));
        }
        if let Some(libre_no) = &patch.libre_no {
            fields.insert("libre_no".to_string(), json!(libre_no));
        }
        if let Some(model) = &patch.model {
            fields.insert("model".to_string(), json!(model));
        }
        if let Some(year) = patch.year {
            validation::validate_year(year)?;
            fields.insert("year".to_string(), json!(year));
        }
        if let Some(color) = &patch.color {
            fields.insert("color".to_string(), json!(color));
        }
        if let Some(fuel_type) = &patch.fuel_type {
            fields.insert("fuel_type".to_string(), json!(fuel_type));
        }
        if let Some(status) = patch.status {
            fields.insert("status".to_string(), json!(status));
        }

        let rows = self
            .gateway
            .update(tables::CARS, Filter::new().eq("id", car_id), Value::Object(fields))
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Query(format!("Car not found: {}", car_id)))?;
        decode(row)
    }

    /// Hard-deletes a car. Ledger rows referencing it are left alone.
    pub async fn delete_car(&self, car_id: &str) -> ClientResult<()> {
        debug!(car_id = %car_id, "delete_car");
        self.gateway
            .delete(tables::CARS, Filter::new().eq("id", car_id))
            .await?;
        Ok(())
    }

    /// Fetches every car in one status, newest first.
    pub async fn get_cars_by_status(&self, status: CarStatus) -> ClientResult<Vec<Car>> {
        let rows = self
            .gateway
            .select(
                tables::CARS,
                Filter::new()
                    .eq("status", status.as_str())
                    .order_desc("created_at"),
            )
            .await?;
        decode_rows(rows)
    }

    // =========================================================================
    // Assignments
    // =========================================================================

    /// Gives the car a new driver, closing any current assignment.
    pub async fn assign_driver(
        &self,
        car_id: &str,
        driver_user_id: &str,
    ) -> ClientResult<DriverAssignment> {
        debug!(car_id = %car_id, driver_user_id = %driver_user_id, "assign_driver");

        let driver_row = self
            .gateway
            .select_single(tables::DRIVERS, Filter::new().eq("user_id", driver_user_id))
            .await?;
        let driver: DriverRecord = decode(driver_row)?;

        // Close whatever is currently open for this car
        let open = Filter::new().eq("car_id", car_id).is_null("unassigned_at");
        self.gateway
            .update(
                tables::CAR_DRIVER,
                open.clone(),
                json!({ "unassigned_at": Utc::now() }),
            )
            .await?;

        // The close and the insert are separate writes; refuse to open a
        // second active row if a concurrent assigner got here first
        let still_open = self.gateway.select(tables::CAR_DRIVER, open).await?;
        if !still_open.is_empty() {
            return Err(ClientError::Query(format!(
                "Car {} already has an active driver",
                car_id
            )));
        }

        let row = json!({
            "car_id": car_id,
            "driver_id": driver.id,
            "assigned_at": Utc::now(),
            "unassigned_at": null,
        });
        let stored = self.gateway.insert(tables::CAR_DRIVER, row).await?;
        decode(stored)
    }

    /// Adds a manager to the car. Several managers may be active at once.
    pub async fn assign_manager(
        &self,
        car_id: &str,
        manager_user_id: &str,
    ) -> ClientResult<ManagerAssignment> {
        debug!(car_id = %car_id, manager_user_id = %manager_user_id, "assign_manager");

        let manager_row = self
            .gateway
            .select_single(tables::MANAGERS, Filter::new().eq("user_id", manager_user_id))
            .await?;
        let manager: ManagerRecord = decode(manager_row)?;

        let row = json!({
            "car_id": car_id,
            "manager_id": manager.id,
            "assigned_at": Utc::now(),
        });
        let stored = self.gateway.insert(tables::CAR_MANAGER, row).await?;
        decode(stored)
    }

    /// The currently active driver assignment for a car, if any.
    pub async fn active_driver_assignment(
        &self,
        car_id: &str,
    ) -> ClientResult<Option<DriverAssignment>> {
        let rows = self
            .gateway
            .select(
                tables::CAR_DRIVER,
                Filter::new().eq("car_id", car_id).is_null("unassigned_at"),
            )
            .await?;
        let mut assignments: Vec<DriverAssignment> = decode_rows(rows)?;
        Ok(if assignments.is_empty() {
            None
        } else {
            Some(assignments.remove(0))
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
