pub mod category_queries;
pub mod order_queries;
pub mod product_queries;
pub mod user_queries;
