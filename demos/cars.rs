//! Car inventory demo: a request logger, JSON routes and a form POST.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example cars
//!
//! Try:
//!   curl -i http://localhost:3000/api/ping
//!   curl -i http://localhost:3000/api/cars
//!   curl -i -X POST http://localhost:3000/api/cars -d 'name=volvo+xc90'
//!   curl -i http://localhost:3000/api/cars/0
//!   curl -i http://localhost:3000/api/cars/99

use std::sync::Arc;
use std::time::Duration;

use peel::{App, BoxFuture, Config, Context, HttpError, Json, Route, StatusCode, from_fn};
use tokio::sync::Mutex;

/// Stand-in for a slow data source.
#[derive(Default)]
struct Inventory {
    cars: Mutex<Vec<String>>,
}

impl Inventory {
    async fn get_all(&self) -> Vec<String> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.cars.lock().await.clone()
    }

    async fn add_one(&self, name: String) -> Vec<String> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut cars = self.cars.lock().await;
        cars.push(name);
        cars.clone()
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let inventory = Arc::new(Inventory::default());
    inventory.add_one("Audi r8".to_owned()).await;
    inventory.add_one("BMW i8".to_owned()).await;

    let config = match Config::load() {
        Ok(config) => config.timer(true),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    App::new(config)
        .with(from_fn(|ctx, next| {
            Box::pin(async move {
                let line = format!("{} {}", ctx.request.method(), ctx.request.path());
                next.run(ctx).await?;
                ctx.log().info(format!("{line} -> {}", ctx.response.status()));
                Ok(())
            })
        }))
        .route(vec![
            Route::get("/api/ping", ping),
            list_cars(Arc::clone(&inventory)),
            add_car(Arc::clone(&inventory)),
            get_car(inventory),
        ])
        .go()
        .await;
}

// GET /api/ping
fn ping(_ctx: &mut Context) -> BoxFuture<'_, Result<&'static str, HttpError>> {
    Box::pin(async { Ok("pong") })
}

// GET /api/cars
fn list_cars(inventory: Arc<Inventory>) -> Route {
    Route::get("/api/cars", move |_ctx| {
        let inventory = Arc::clone(&inventory);
        Box::pin(async move { Ok::<_, HttpError>(Json(inventory.get_all().await)) })
    })
}

// POST /api/cars   body: name=<car>
fn add_car(inventory: Arc<Inventory>) -> Route {
    Route::post("/api/cars", move |ctx| {
        let inventory = Arc::clone(&inventory);
        Box::pin(async move {
            let name = ctx
                .request
                .form()
                .and_then(|form| form.get("name"))
                .cloned()
                .ok_or_else(|| HttpError::bad_request("name is required"))?;
            Ok::<_, HttpError>(Json(inventory.add_one(name).await))
        })
    })
}

// GET /api/cars/:index
fn get_car(inventory: Arc<Inventory>) -> Route {
    Route::get("/api/cars/:index", move |ctx| {
        let inventory = Arc::clone(&inventory);
        Box::pin(async move {
            let index: usize = ctx
                .request
                .path_param("index")
                .and_then(|i| i.parse().ok())
                .ok_or_else(|| HttpError::bad_request("index must be a number"))?;
            inventory
                .get_all()
                .await
                .into_iter()
                .nth(index)
                .ok_or_else(|| HttpError::new(StatusCode::NOT_FOUND, "no such car"))
        })
    })
}
