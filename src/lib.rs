//! Coupon API Library
//!
//! This crate provides the coupon validation and redemption engine for a
//! fan-merchandise storefront. The HTTP boundary is not part of the
//! crate; callers drive it through [`services::coupons::CouponService`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod repositories;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use repositories::product_repository::ProductRepository;
use services::coupons::CouponService;
use services::redemptions::RedemptionService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub coupons: CouponService,
    pub products: ProductRepository,
    pub redemptions: RedemptionService,
}

impl AppState {
    /// Wires the coupon engine's services over a shared connection pool.
    pub fn new(
        db: DatabaseConnection,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let db = Arc::new(db);
        let event_sender = Arc::new(event_sender);
        Self {
            coupons: CouponService::new(db.clone(), event_sender.clone()),
            products: ProductRepository::new(db.clone()),
            redemptions: RedemptionService::new(db.clone()),
            db,
            config,
            event_sender,
        }
    }

    pub fn coupon_service(&self) -> &CouponService {
        &self.coupons
    }
}
