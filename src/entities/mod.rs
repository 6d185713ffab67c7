// Catalog
pub mod product;

// Coupon engine tables
pub mod coupon;
pub mod coupon_redemption;
pub mod coupon_usage_log;
