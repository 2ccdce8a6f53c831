pub mod discussions_repo;
pub mod migrations;
pub mod pool;
pub mod posts_repo;
pub mod store;

pub use discussions_repo::{
    delete_reaction, insert_discussion, insert_reaction, list_discussions,
    list_reaction_counts, list_user_reactions, DiscussionRecord, DiscussionsRepoError,
    NewDiscussionRecord, ReactionCountRecord,
};
pub use migrations::run_migrations;
pub use pool::{connect_lazy, DbPool, DbPoolError};
pub use posts_repo::{find_post, list_post_reaction_counts, PostRecord};
pub use store::PgReplyStore;
