mod resource_pool;
mod resource_pool_membership;

pub(crate) use resource_pool::{apply_pool, member_type};
pub use resource_pool::PoolResource;
pub use resource_pool_membership::{
    deduce_membership_type, membership_from_id, parse_membership_id, Member, Membership,
    MembershipError, MembershipType, PoolMembershipResource,
};
