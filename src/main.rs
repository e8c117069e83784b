use std::convert::Infallible;
use std::sync::Arc;

use clap::Parser;
use log::{debug, info};
use warp::http::{header, StatusCode, Uri};
use warp::{Filter, Rejection, Reply};

use crate::args::Args;
use crate::config::Config;
use crate::nature::NatureImage;
use crate::session::SESSION_COOKIE;
use crate::store::Store;
use crate::trailhead::{
    LoginForm, LoginOutcome, ProbeOutcome, SignupForm, SignupOutcome, Trailhead, Visitor,
};

mod args;
mod config;
mod credentials;
mod nature;
mod pages;
mod session;
mod store;
mod trailhead;
mod user;
mod validate;

#[cfg(test)]
mod mock;

type Response = warp::reply::Response;

const FORM_LIMIT: u64 = 1024 * 16;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    pretty_env_logger::init();

    let args = Args::parse();
    let addr = args.addr().expect("invalid listen address");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(missing) => {
            eprintln!("{missing} is not set");
            std::process::exit(1);
        }
    };

    let store = Store::connect(&config).await.expect("store connection");
    let app = Arc::new(Trailhead::new(store, config));

    info!("trailhead listening on {addr}");

    warp::serve(routes(app, args.secure())).run(addr).await;
}

fn routes(
    app: Arc<Trailhead>,
    secure: bool,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_app = warp::any().map(move || Arc::clone(&app));
    let with_secure = warp::any().map(move || secure);
    let session_cookie = warp::cookie::optional::<String>(SESSION_COOKIE);

    let home = warp::path::end()
        .and(warp::get())
        .and(with_app.clone())
        .and(session_cookie)
        .and_then(home_page);

    let signup = warp::path!("signup")
        .and(warp::get())
        .map(|| warp::reply::html(pages::signup_form()));

    let login = warp::path!("login")
        .and(warp::get())
        .map(|| warp::reply::html(pages::login_form()));

    let submit_user = warp::path!("submitUser")
        .and(warp::post())
        .and(with_app.clone())
        .and(with_secure)
        .and(warp::body::content_length_limit(FORM_LIMIT))
        .and(warp::body::form())
        .and_then(submit_user);

    let logging_in = warp::path!("loggingin")
        .and(warp::post())
        .and(with_app.clone())
        .and(with_secure)
        .and(warp::body::content_length_limit(FORM_LIMIT))
        .and(warp::body::form())
        .and_then(logging_in);

    let logged_in = warp::path!("loggedin")
        .and(warp::get())
        .and(with_app.clone())
        .and(session_cookie)
        .and_then(logged_in);

    let logout = warp::path!("logout")
        .and(warp::get())
        .and(with_app.clone())
        .and(with_secure)
        .and(session_cookie)
        .and_then(logout_page);

    let members = warp::path!("members")
        .and(warp::get())
        .and(with_app.clone())
        .and(session_cookie)
        .and_then(members_page);

    let nature = warp::path!("nature" / u32)
        .and(warp::get())
        .map(nature_page);

    let nosql_injection = warp::path!("nosql-injection")
        .and(warp::get())
        .and(with_app)
        .and(
            warp::query::raw().or_else(|_| async { Ok::<(String,), Rejection>((String::new(),)) }),
        )
        .and_then(nosql_injection);

    let static_files = warp::get().and(warp::fs::dir("public"));

    let not_found = warp::any().map(|| {
        warp::reply::with_status(warp::reply::html(pages::not_found()), StatusCode::NOT_FOUND)
    });

    home.or(nosql_injection)
        .or(signup)
        .or(login)
        .or(submit_user)
        .or(logging_in)
        .or(logged_in)
        .or(logout)
        .or(nature)
        .or(members)
        .or(static_files)
        .or(not_found)
        .with(warp::log("trailhead"))
}

async fn home_page(app: Arc<Trailhead>, cookie: Option<String>) -> Result<Response, Rejection> {
    let page = match app.visitor(cookie.as_deref()).await {
        Visitor::Member { username, .. } => pages::home_member(&username),
        Visitor::Anonymous => pages::home_anonymous(),
    };

    Ok(warp::reply::html(page).into_response())
}

async fn submit_user(
    app: Arc<Trailhead>,
    secure: bool,
    form: SignupForm,
) -> Result<Response, Rejection> {
    Ok(match app.sign_up(form).await {
        SignupOutcome::Created { cookie } => redirect_with_cookie("/", &cookie, secure),
        SignupOutcome::Invalid(invalid) => {
            warp::reply::html(pages::signup_error(&invalid)).into_response()
        }
        SignupOutcome::Failed => {
            warp::redirect::found(Uri::from_static("/signup")).into_response()
        }
    })
}

async fn logging_in(
    app: Arc<Trailhead>,
    secure: bool,
    form: LoginForm,
) -> Result<Response, Rejection> {
    Ok(match app.log_in(form).await {
        LoginOutcome::LoggedIn { cookie } => redirect_with_cookie("/loggedin", &cookie, secure),
        LoginOutcome::WrongPassword => {
            warp::reply::html(pages::wrong_password()).into_response()
        }
        LoginOutcome::Rejected => warp::redirect::found(Uri::from_static("/login")).into_response(),
    })
}

async fn logged_in(app: Arc<Trailhead>, cookie: Option<String>) -> Result<Response, Rejection> {
    let to = match app.visitor(cookie.as_deref()).await {
        Visitor::Member { .. } => Uri::from_static("/"),
        Visitor::Anonymous => Uri::from_static("/login"),
    };

    Ok(warp::redirect::found(to).into_response())
}

async fn logout_page(
    app: Arc<Trailhead>,
    secure: bool,
    cookie: Option<String>,
) -> Result<Response, Rejection> {
    app.log_out(cookie.as_deref()).await;

    let clear = session::clear_cookie(secure);
    Ok(warp::reply::with_header(
        warp::redirect::found(Uri::from_static("/")),
        header::SET_COOKIE,
        clear.to_string(),
    )
    .into_response())
}

async fn members_page(app: Arc<Trailhead>, cookie: Option<String>) -> Result<Response, Rejection> {
    Ok(match app.visitor(cookie.as_deref()).await {
        Visitor::Member { username, email } => {
            debug!("members visit by {username} ({email})");
            let image = NatureImage::random();
            warp::reply::html(pages::members(&username, image)).into_response()
        }
        Visitor::Anonymous => warp::redirect::found(Uri::from_static("/")).into_response(),
    })
}

fn nature_page(id: u32) -> warp::reply::Html<String> {
    match NatureImage::from_id(id) {
        Some(image) => warp::reply::html(pages::nature(image)),
        None => warp::reply::html(pages::nature_unknown(id)),
    }
}

async fn nosql_injection(app: Arc<Trailhead>, raw_query: String) -> Result<Response, Rejection> {
    let page = match app.probe(&raw_query).await {
        ProbeOutcome::Usage => pages::injection_usage(),
        ProbeOutcome::Detected => pages::injection_detected(),
        ProbeOutcome::Greeting(username) => pages::injection_greeting(&username),
    };

    Ok(warp::reply::html(page).into_response())
}

fn redirect_with_cookie(to: &'static str, cookie_value: &str, secure: bool) -> Response {
    let cookie = session::cookie(cookie_value, secure);

    warp::reply::with_header(
        warp::redirect::found(Uri::from_static(to)),
        header::SET_COOKIE,
        cookie.to_string(),
    )
    .into_response()
}
