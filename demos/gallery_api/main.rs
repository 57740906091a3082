//! Gallery API example
//!
//! A small exhibition-gallery backend wired entirely through staged
//! pipelines: schema validation for bodies, queries and path parameters,
//! upload constraint checks, and response screening on the comment feed.
//! Storage is an in-memory map; every route answers with the uniform
//! success/error envelope.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::Json;
use axum::response::IntoResponse;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vernissage::prelude::*;

/// In-memory store for one entity kind
#[derive(Clone)]
struct Shelf {
    data: Arc<RwLock<HashMap<Uuid, Value>>>,
}

impl Shelf {
    fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn add(&self, id: Uuid, record: Value) {
        self.data.write().unwrap().insert(id, record);
    }

    fn get(&self, id: &Uuid) -> Option<Value> {
        self.data.read().unwrap().get(id).cloned()
    }

    fn list(&self) -> Vec<Value> {
        self.data.read().unwrap().values().cloned().collect()
    }
}

#[derive(Clone)]
struct GalleryStore {
    users: Shelf,
    artworks: Shelf,
    exhibitions: Shelf,
    comments: Shelf,
}

impl GalleryStore {
    fn new() -> Self {
        Self {
            users: Shelf::new(),
            artworks: Shelf::new(),
            exhibitions: Shelf::new(),
            comments: Shelf::new(),
        }
    }
}

/// Stand-in for a real password hasher.
fn fake_hash(password: &str) -> String {
    format!("demo${}${}", password.len(), password.chars().rev().collect::<String>())
}

fn not_found(what: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorEnvelope::new(format!("{} not found", what))),
    )
        .into_response()
}

/// Turns the JSON upload descriptor in the body into a file on the context,
/// so the constraint stage has something to inspect. A real deployment
/// would populate this from its multipart layer.
struct DescribeUploadStage;

#[async_trait]
impl Stage for DescribeUploadStage {
    fn name(&self) -> &str {
        "describe_upload"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> StageFlow {
        let body = ctx.body();
        let name = body["file_name"].as_str().unwrap_or("upload.bin").to_string();
        let mime = body["mime_type"].as_str().unwrap_or("application/octet-stream").to_string();
        let size = body["size_bytes"].as_u64().unwrap_or(0);
        ctx.set_file(UploadedFile::new("image", mime, size, name));
        StageFlow::Continue
    }
}

fn id_params_stage() -> ValidationStage {
    ValidationStage::new(
        "IdParams",
        fixed_factory(vernissage::entities::common::id_params_schema()),
    )
    .source(Bucket::Params)
    .attach_name("params")
}

fn user_routes(store: GalleryStore) -> Router {
    let register = {
        let store = store.clone();
        staged(
            StagePipeline::new().stage(ValidationStage::new(
                "UserCreate",
                registry_factory(EntityKind::User, Intent::Create),
            )),
            move |mut ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let mut dto = ctx.take_object("dto").expect("attached by the pipeline");
                    let id = Uuid::new_v4();
                    let password = dto.remove("password").and_then(|v| {
                        v.as_str().map(fake_hash)
                    });
                    dto.set("id", json!(id.to_string()));
                    if let Some(hash) = password {
                        dto.set("_password_hash", json!(hash));
                    }

                    store.users.add(id, dto.to_plain(true));
                    // the private hash stays behind
                    Ok(respond::created(dto.to_plain(false)))
                }
            },
        )
    };

    let login = {
        let store = store.clone();
        staged(
            StagePipeline::new().stage(
                ValidationStage::new(
                    "UserLogin",
                    registry_factory(EntityKind::User, Intent::Login),
                )
                .attach_name("credentials"),
            ),
            move |ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let credentials = ctx.object("credentials").expect("attached");
                    let email = credentials.get("email").and_then(|v| v.as_str()).unwrap_or("");
                    let password = credentials
                        .get("password")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");

                    let account = store
                        .users
                        .list()
                        .into_iter()
                        .find(|u| u["email"] == json!(email));
                    let Some(account) = account else {
                        return Ok((
                            StatusCode::UNAUTHORIZED,
                            Json(ErrorEnvelope::new("invalid credentials")),
                        )
                            .into_response());
                    };

                    if account["_password_hash"] != json!(fake_hash(password)) {
                        return Ok((
                            StatusCode::UNAUTHORIZED,
                            Json(ErrorEnvelope::new("invalid credentials")),
                        )
                            .into_response());
                    }

                    let mut public = account;
                    if let Some(fields) = public.as_object_mut() {
                        fields.remove("_password_hash");
                    }
                    Ok(respond::ok_with_message(public, "welcome back"))
                }
            },
        )
    };

    Router::new()
        .route("/users", post(register))
        .route("/login", post(login))
}

fn artwork_routes(store: GalleryStore, settings: &PipelineSettings) -> Router {
    let create = {
        let store = store.clone();
        staged(
            StagePipeline::new().stage(ValidationStage::new(
                "ArtworkCreate",
                registry_factory(EntityKind::Artwork, Intent::Create),
            )),
            move |mut ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let mut dto = ctx.take_object("dto").expect("attached");
                    let id = Uuid::new_v4();
                    dto.set("id", json!(id.to_string()));
                    dto.set("created_at", json!(Utc::now().to_rfc3339()));

                    store.artworks.add(id, dto.to_plain(true));
                    Ok(respond::created(dto.to_plain(false)))
                }
            },
        )
    };

    let list = {
        let store = store.clone();
        staged(
            StagePipeline::new().stage(
                ValidationStage::new(
                    "ArtworkQuery",
                    registry_factory(EntityKind::Artwork, Intent::Query),
                )
                .source(Bucket::Query)
                .attach_name("filters"),
            ),
            move |ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let filters = ctx.object("filters").expect("attached");
                    let page = filters.get("page").and_then(|v| v.as_u64()).unwrap_or(1) as usize;
                    let per_page =
                        filters.get("per_page").and_then(|v| v.as_u64()).unwrap_or(20) as usize;
                    let medium = filters.get("medium").and_then(|v| v.as_str());
                    let sort = filters.get("sort").and_then(|v| v.as_str()).unwrap_or("newest");

                    let mut items: Vec<Value> = store
                        .artworks
                        .list()
                        .into_iter()
                        .filter(|a| medium.is_none_or(|m| a["medium"] == json!(m)))
                        .collect();
                    match sort {
                        "title" => items.sort_by(|a, b| {
                            a["title"].as_str().cmp(&b["title"].as_str())
                        }),
                        "price" => items.sort_by(|a, b| {
                            a["price"]
                                .as_f64()
                                .partial_cmp(&b["price"].as_f64())
                                .unwrap_or(std::cmp::Ordering::Equal)
                        }),
                        "oldest" => items.sort_by(|a, b| {
                            a["created_at"].as_str().cmp(&b["created_at"].as_str())
                        }),
                        _ => items.sort_by(|a, b| {
                            b["created_at"].as_str().cmp(&a["created_at"].as_str())
                        }),
                    }

                    let total = items.len();
                    let paged: Vec<Value> = items
                        .into_iter()
                        .skip((page - 1) * per_page)
                        .take(per_page)
                        .collect();

                    Ok(respond::ok(json!({
                        "items": paged,
                        "page": page,
                        "per_page": per_page,
                        "total": total,
                    })))
                }
            },
        )
    };

    let fetch = {
        let store = store.clone();
        staged(
            StagePipeline::new().stage(id_params_stage()),
            move |ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let params = ctx.object("params").expect("attached");
                    let id = params
                        .get("id")
                        .and_then(|v| v.as_str())
                        .and_then(|s| Uuid::parse_str(s).ok())
                        .expect("validated as a UUID");

                    match store.artworks.get(&id) {
                        Some(artwork) => Ok(respond::ok(artwork)),
                        None => Ok(not_found("artwork")),
                    }
                }
            },
        )
    };

    let update = {
        let store = store.clone();
        staged(
            StagePipeline::new().stage(
                CompositeValidationStage::new()
                    .rule(
                        ValidationRule::new(
                            "IdParams",
                            fixed_factory(vernissage::entities::common::id_params_schema()),
                        )
                        .source(Bucket::Params)
                        .attach_name("params"),
                    )
                    .rule(
                        ValidationRule::new(
                            "ArtworkUpdate",
                            registry_factory(EntityKind::Artwork, Intent::Update),
                        )
                        .attach_name("changes")
                        .when(|ctx| {
                            ctx.body().as_object().is_some_and(|m| !m.is_empty())
                        }),
                    ),
            ),
            move |ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let params = ctx.object("params").expect("attached");
                    let id = params
                        .get("id")
                        .and_then(|v| v.as_str())
                        .and_then(|s| Uuid::parse_str(s).ok())
                        .expect("validated as a UUID");

                    let Some(mut artwork) = store.artworks.get(&id) else {
                        return Ok(not_found("artwork"));
                    };

                    if let Some(changes) = ctx.object("changes") {
                        if let (Some(target), Value::Object(patch)) =
                            (artwork.as_object_mut(), changes.to_plain(true))
                        {
                            for (key, value) in patch {
                                target.insert(key, value);
                            }
                        }
                    }

                    store.artworks.add(id, artwork.clone());
                    Ok(respond::ok(artwork))
                }
            },
        )
    };

    let upload = {
        let store = store.clone();
        staged(
            StagePipeline::new()
                .stage(id_params_stage())
                .stage(ConditionalStage::new(
                    |ctx| ctx.body().get("file_name").is_some(),
                    DescribeUploadStage,
                ))
                .stage(AttachmentConstraintStage::from_settings(settings).required(true)),
            move |ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let params = ctx.object("params").expect("attached");
                    let id = params
                        .get("id")
                        .and_then(|v| v.as_str())
                        .and_then(|s| Uuid::parse_str(s).ok())
                        .expect("validated as a UUID");

                    let Some(mut artwork) = store.artworks.get(&id) else {
                        return Ok(not_found("artwork"));
                    };

                    let file = ctx.file().expect("checked by the constraint stage");
                    artwork["image"] = json!({
                        "name": file.original_name,
                        "mime_type": file.mime_type,
                        "size_bytes": file.size_bytes,
                    });
                    store.artworks.add(id, artwork.clone());
                    Ok(respond::ok(artwork))
                }
            },
        )
    };

    Router::new()
        .route("/artworks", get(list).post(create))
        .route("/artworks/{id}", get(fetch).put(update))
        .route("/artworks/{id}/image", post(upload))
}

fn exhibition_routes(store: GalleryStore) -> Router {
    let create = {
        let store = store.clone();
        staged(
            StagePipeline::new().stage(ValidationStage::new(
                "ExhibitionCreate",
                registry_factory(EntityKind::Exhibition, Intent::Create),
            )),
            move |mut ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let mut dto = ctx.take_object("dto").expect("attached");
                    let id = Uuid::new_v4();
                    dto.set("id", json!(id.to_string()));

                    store.exhibitions.add(id, dto.to_plain(true));
                    Ok(respond::created(dto.to_plain(false)))
                }
            },
        )
    };

    let list = {
        let store = store.clone();
        staged(
            StagePipeline::new().stage(
                ValidationStage::new(
                    "ExhibitionQuery",
                    registry_factory(EntityKind::Exhibition, Intent::Query),
                )
                .source(Bucket::Query)
                .attach_name("filters"),
            ),
            move |ctx: RequestContext| {
                let store = store.clone();
                async move {
                    let filters = ctx.object("filters").expect("attached");
                    let open = filters.get("open_to_public").and_then(|v| v.as_bool());
                    let items: Vec<Value> = store
                        .exhibitions
                        .list()
                        .into_iter()
                        .filter(|e| open.is_none_or(|o| e["open_to_public"] == json!(o)))
                        .collect();
                    Ok(respond::ok(json!({"items": items})))
                }
            },
        )
    };

    Router::new().route("/exhibitions", get(list).post(create))
}

fn comment_routes(store: GalleryStore, settings: &PipelineSettings) -> Router {
    let screening = Arc::new(ResponseValidationStage::from_settings(
        SchemaRegistry::global()
            .get(EntityKind::Comment, Intent::Response)
            .expect("comment response schema is registered"),
        settings,
    ));

    let create = {
        let store = store.clone();
        let screening = screening.clone();
        staged(
            StagePipeline::new().stage(ValidationStage::new(
                "CommentCreate",
                registry_factory(EntityKind::Comment, Intent::Create),
            )),
            move |mut ctx: RequestContext| {
                let store = store.clone();
                let screening = screening.clone();
                async move {
                    let mut dto = ctx.take_object("dto").expect("attached");
                    let id = Uuid::new_v4();
                    dto.set("id", json!(id.to_string()));

                    store.comments.add(id, dto.to_plain(true));
                    Ok(respond::screened(
                        screening.as_ref(),
                        "/comments",
                        StatusCode::CREATED,
                        dto.to_plain(false),
                    ))
                }
            },
        )
    };

    Router::new().route("/comments", post(create))
}

pub fn gallery_router(store: GalleryStore, settings: &PipelineSettings) -> Router {
    Router::new()
        .merge(user_routes(store.clone()))
        .merge(artwork_routes(store.clone(), settings))
        .merge(exhibition_routes(store.clone()))
        .merge(comment_routes(store, settings))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vernissage=debug".into()),
        )
        .init();

    let settings = PipelineSettings::from_env();
    let store = GalleryStore::new();
    let app = gallery_router(store, &settings);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;

    println!("🖼️  Gallery API running on http://127.0.0.1:3000");
    println!("\n  Routes:");
    println!("    POST /users                - Register (role defaults to visitor)");
    println!("    POST /login                - Check credentials");
    println!("    GET  /artworks             - List with validated query filters");
    println!("    POST /artworks             - Create from a validated body");
    println!("    GET  /artworks/{{id}}        - Fetch one (UUID-checked path)");
    println!("    PUT  /artworks/{{id}}        - Update, body rule skipped when empty");
    println!("    POST /artworks/{{id}}/image  - Attach an upload descriptor");
    println!("    GET  /exhibitions          - List with validated query filters");
    println!("    POST /exhibitions          - Create from a validated body");
    println!("    POST /comments             - Create, response screened on the way out");

    axum::serve(listener, app).await?;
    Ok(())
}
