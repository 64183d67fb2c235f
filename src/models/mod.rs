mod category;
mod order;
mod product;
mod user;

pub use category::{Category, CategoryQuery, CreateCategoryRequest, UpdateCategoryRequest};
pub use order::{
    CartItem, CreateOrderRequest, CreateOrderResponse, Order, OrderFilter, OrderItem,
    OrderResponse, OrderStats, OrderStatus, PaymentMethod, StatusCount, UpdateOrderRequest,
    UpdateOrderStatusRequest,
};
pub use product::{
    CreateProductRequest, Product, ProductGalleryImage, ProductQuery, ProductResponse,
    ProductSpecification, SpecificationInput, UpdateProductRequest,
};
pub use user::{
    AuthResponse, CreateUserRequest, LoginRequest, RegisterRequest, UpdateUserRequest, User,
    UserResponse, UserRole,
};
