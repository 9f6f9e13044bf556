use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;

use crate::server::configure_payloads;

pub async fn post_json(path: &str, body: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    call(req, configure).await
}

pub async fn post_form(path: &str, body: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/x-www-form-urlencoded"))
        .set_payload(body.to_string());
    call(req, configure).await
}

pub async fn get(path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    call(TestRequest::get().uri(path), configure).await
}

async fn call(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().configure(configure_payloads).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
