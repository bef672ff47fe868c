//! GraphQL surface
//!
//! A single POST entry point over the same data model as the REST
//! routes. Identity resolution happens upstream and never rejects, so
//! public queries work unauthenticated while each mutation decides its
//! own auth policy.

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, InputObject, Object, Result as GqlResult, Schema,
    SimpleObject,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Extension;

use crate::config::AppState;
use crate::ctx::ResolvedIdentity;
use crate::error::Error;
use crate::guard::authorize_mutation;
use crate::images;
use crate::live::FeedEvent;
use crate::posts::{self, PostInput};

pub type FeedSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

impl ErrorExtensions for Error {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.message()).extend_with(|_, e| e.set("code", self.code()))
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Creator")]
pub struct CreatorObject {
    pub id: String,
    pub name: String,
}

/// Post with dates stringified for the wire.
#[derive(SimpleObject)]
#[graphql(name = "Post")]
pub struct PostObject {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator: CreatorObject,
    pub created_at: String,
    pub updated_at: String,
}

impl From<posts::Post> for PostObject {
    fn from(post: posts::Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            image_url: post.image_url,
            creator: CreatorObject {
                id: post.creator.id,
                name: post.creator.name,
            },
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "PostPage")]
pub struct PostPage {
    pub posts: Vec<PostObject>,
    pub total_posts: i64,
}

#[derive(SimpleObject)]
#[graphql(name = "User")]
pub struct UserObject {
    pub id: String,
    pub email: String,
    pub name: String,
    pub status: String,
}

#[derive(SimpleObject)]
#[graphql(name = "AuthData")]
pub struct AuthData {
    pub token: String,
    pub user_id: String,
}

#[derive(InputObject)]
pub struct UserInputData {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(InputObject)]
pub struct PostInputData {
    pub title: String,
    pub content: String,
    pub image_url: String,
}

/// Resolve the caller to a live user id, failing closed when the token
/// is anonymous or the user record no longer exists.
async fn require_live_user(ctx: &Context<'_>) -> GqlResult<String> {
    let identity = ctx.data_unchecked::<ResolvedIdentity>();
    let user_id = identity.require_authenticated().map_err(|e| e.extend())?;

    let state = ctx.data_unchecked::<AppState>();
    state
        .auth
        .get_user(user_id)
        .await
        .map_err(|_| Error::Unauthenticated.extend())?;

    Ok(user_id.to_string())
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Newest-first page of posts - public.
    async fn posts(&self, ctx: &Context<'_>, page: Option<u32>) -> GqlResult<PostPage> {
        let state = ctx.data_unchecked::<AppState>();
        let (posts, total_posts) = state
            .posts
            .list_page(page.unwrap_or(1), state.config.posts_per_page)
            .await
            .map_err(|e| e.extend())?;

        Ok(PostPage {
            posts: posts.into_iter().map(Into::into).collect(),
            total_posts,
        })
    }

    /// Single post by id - public.
    async fn post(&self, ctx: &Context<'_>, id: String) -> GqlResult<PostObject> {
        let state = ctx.data_unchecked::<AppState>();
        let post = state
            .posts
            .find(&id)
            .await
            .map_err(|e| e.extend())?
            .ok_or_else(|| Error::NotFound(format!("No post found matching id {}", id)).extend())?;

        Ok(post.into())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_user(&self, ctx: &Context<'_>, input: UserInputData) -> GqlResult<UserObject> {
        let state = ctx.data_unchecked::<AppState>();
        let user = state
            .auth
            .signup(&input.email, &input.name, &input.password)
            .await
            .map_err(|e| e.extend())?;

        Ok(UserObject {
            id: user.id,
            email: user.email,
            name: user.name,
            status: user.status,
        })
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GqlResult<AuthData> {
        let state = ctx.data_unchecked::<AppState>();
        let outcome = state
            .auth
            .login(&email, &password)
            .await
            .map_err(|e| e.extend())?;

        Ok(AuthData {
            token: outcome.token,
            user_id: outcome.user_id,
        })
    }

    async fn create_post(&self, ctx: &Context<'_>, input: PostInputData) -> GqlResult<PostObject> {
        let user_id = require_live_user(ctx).await?;
        let state = ctx.data_unchecked::<AppState>();

        let input = PostInput::parse(&input.title, &input.content, &input.image_url)
            .map_err(|e| e.extend())?;
        let post = state
            .posts
            .create(input, &user_id)
            .await
            .map_err(|e| e.extend())?;

        state.events.emit(FeedEvent::Created { post: post.clone() });

        Ok(post.into())
    }

    async fn update_post(
        &self,
        ctx: &Context<'_>,
        id: String,
        input: PostInputData,
    ) -> GqlResult<PostObject> {
        let state = ctx.data_unchecked::<AppState>();
        let identity = ctx.data_unchecked::<ResolvedIdentity>();

        let input = PostInput::parse(&input.title, &input.content, &input.image_url)
            .map_err(|e| e.extend())?;

        let existing = state
            .posts
            .find(&id)
            .await
            .map_err(|e| e.extend())?
            .ok_or_else(|| Error::NotFound(format!("No post matching id {}", id)).extend())?;

        authorize_mutation(identity, &existing.creator.id).map_err(|e| e.extend())?;

        if input.image_url != existing.image_url {
            images::clear_image(&state.config, &existing.image_url).await;
        }

        let post = state
            .posts
            .update(&id, input)
            .await
            .map_err(|e| e.extend())?;

        state.events.emit(FeedEvent::Updated { post: post.clone() });

        Ok(post.into())
    }

    async fn delete_post(&self, ctx: &Context<'_>, id: String) -> GqlResult<bool> {
        let state = ctx.data_unchecked::<AppState>();
        let identity = ctx.data_unchecked::<ResolvedIdentity>();

        let existing = state
            .posts
            .find(&id)
            .await
            .map_err(|e| e.extend())?
            .ok_or_else(|| Error::NotFound(format!("No post matching id {}", id)).extend())?;

        authorize_mutation(identity, &existing.creator.id).map_err(|e| e.extend())?;

        images::clear_image(&state.config, &existing.image_url).await;
        state.posts.remove(&id).await.map_err(|e| e.extend())?;

        state.events.emit(FeedEvent::Deleted { post_id: id });

        Ok(true)
    }
}

pub fn build_schema(state: AppState) -> FeedSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}

/// POST /graphql
pub async fn graphql_handler(
    Extension(schema): Extension<FeedSchema>,
    Extension(identity): Extension<ResolvedIdentity>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner().data(identity)).await.into()
}
