mod auth;
mod boards;
mod posts;
mod profiles;
mod topics;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Build the API router
pub fn router() -> Router<AppState> {
    Router::new()
        // Account routes
        .route("/auth/create", post(auth::create_user))
        .route("/auth/token", post(auth::create_token))
        .route(
            "/auth/me",
            get(auth::me).patch(auth::update_me).put(auth::update_me),
        )
        // Profile routes (read public, write owner-only)
        .route(
            "/users/profiles/{id}",
            get(profiles::get_profile)
                .patch(profiles::update_profile)
                .put(profiles::update_profile),
        )
        // Board routes (writes superuser-only)
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route(
            "/boards/{board_id}",
            get(boards::get_board)
                .patch(boards::update_board)
                .put(boards::update_board)
                .delete(boards::delete_board),
        )
        // Topic routes nested under a board
        .route(
            "/boards/{board_id}/topics",
            get(topics::list_topics).post(topics::create_topic),
        )
        .route(
            "/boards/{board_id}/topics/{topic_id}",
            get(topics::get_topic)
                .patch(topics::update_topic)
                .put(topics::update_topic)
                .delete(topics::delete_topic),
        )
        // Post routes nested under a topic
        .route(
            "/boards/{board_id}/topics/{topic_id}/posts",
            get(posts::list_posts).post(posts::create_post),
        )
        .route(
            "/boards/{board_id}/topics/{topic_id}/posts/{post_id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
}
