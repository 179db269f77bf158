use uuid::Uuid;

/// Where a tenant is being resolved from.
#[derive(Debug, Clone, Copy)]
pub enum TenantContext<'a> {
    Slug(&'a str),
    Order(Uuid),
    User(Uuid),
}
