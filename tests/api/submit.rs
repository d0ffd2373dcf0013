use serde_json::{Value, json};

use crate::support::{self, FakeProvider, list, sample_report, submit};

#[tokio::test]
async fn submitted_report_round_trips() {
    let service = support::start().await;
    let report = json!({
        "demographics": { "nombre": "Ana", "email": "a@x.com" },
        "empresa": { "nombre": "Acme" },
        "pilarScores": { "1": 20, "2": 25, "3": 15, "4": 30, "5": 10 },
        "ismeScore": 66.67
    });

    let resp = service
        .client
        .post(service.url("/api/submit-report"))
        .json(&report)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Reporte guardado y correo enviado");
    let id = body["id"].as_str().unwrap();

    let resp = service
        .client
        .get(service.url(&format!("/api/get-report?id={id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let stored: Value = resp.json().await.unwrap();

    assert_eq!(stored["id"], id);
    assert_eq!(stored["demographics"], report["demographics"]);
    assert_eq!(stored["empresa"], report["empresa"]);
    assert_eq!(stored["ismeScore"], 66.67);
    for pillar in ["1", "2", "3", "4", "5"] {
        assert_eq!(
            stored["pilarScores"][pillar].as_f64(),
            report["pilarScores"][pillar].as_f64()
        );
    }
    assert!(stored["submittedAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn submit_emails_the_pdf() {
    let service = support::start().await;
    let id = submit(&service, &sample_report("Ana", "Acme")).await;

    let received = service.provider.received();
    assert_eq!(received.len(), 1);
    let email = &received[0];

    assert_eq!(email.authorization.as_deref(), Some("Bearer re_test_key"));
    assert_eq!(email.body["from"], "Reporte DSME <noreply@emcotic.com>");
    assert_eq!(email.body["to"], json!(["dpvp.cds@emcotic.com"]));
    assert_eq!(email.body["subject"], "Nuevo Reporte DSME - Ana");
    assert!(email.body["html"].as_str().unwrap().contains("a@x.com"));
    assert_eq!(email.attachment_filename(), format!("Reporte-DSME-{id}.pdf"));
    assert!(email.attachment_bytes().starts_with(b"%PDF"));
}

#[tokio::test]
async fn provider_error_is_reported_and_nothing_is_kept() {
    let service = support::start_with(
        FakeProvider::rejecting("The emcotic.com domain is not verified"),
        Some("re_test_key"),
    )
    .await;

    let resp = service
        .client
        .post(service.url("/api/submit-report"))
        .json(&sample_report("Ana", "Acme"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Error interno del servidor");
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("The emcotic.com domain is not verified")
    );

    assert_eq!(service.provider.received().len(), 1);
    assert!(list(&service).await.is_empty());
}

#[tokio::test]
async fn missing_api_key_fails_without_contacting_provider() {
    let service = support::start_with(FakeProvider::default(), None).await;

    let resp = service
        .client
        .post(service.url("/api/submit-report"))
        .json(&sample_report("Ana", "Acme"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("RESEND_API_KEY"));

    assert!(service.provider.received().is_empty());
    assert!(list(&service).await.is_empty());
}

#[tokio::test]
async fn wrong_method_touches_nothing() {
    let service = support::start().await;

    let resp = service
        .client
        .put(service.url("/api/submit-report"))
        .json(&sample_report("Ana", "Acme"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Método no permitido");

    assert!(service.provider.received().is_empty());
    assert!(list(&service).await.is_empty());
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let service = support::start().await;

    for body in [
        json!({ "empresa": { "nombre": "Acme" } }),
        json!({ "demographics": { "email": "a@x.com" } }),
        json!({ "demographics": { "nombre": "Ana" }, "pilarScores": { "7": 3 } }),
        json!({ "demographics": { "nombre": "Ana" }, "ismeScore": "alto" }),
    ] {
        let resp = service
            .client
            .post(service.url("/api/submit-report"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{body}");
        let error: Value = resp.json().await.unwrap();
        assert!(error["message"].as_str().unwrap().starts_with("Datos del reporte"));
    }

    assert!(service.provider.received().is_empty());
    assert!(list(&service).await.is_empty());
}

#[tokio::test]
async fn legacy_route_and_field_names() {
    let service = support::start().await;

    let resp = service
        .client
        .post(service.url("/api/enviar-reporte-dsme"))
        .json(&json!({
            "demograficos": { "nombreCompleto": "Luis Pérez", "email": "l@x.com" },
            "empresa": { "nombre": "Tienda Luis" },
            "pilarScores": { "pilar1": 12, "pilar3": 30 },
            "ismeScore": 51.2,
            "fecha": "1999-01-01T00:00:00.000Z"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let id = resp.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let stored: Value = service
        .client
        .get(service.url(&format!("/api/get-reporte-individual?id={id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["demographics"]["nombre"], "Luis Pérez");
    assert_eq!(stored["pilarScores"]["3"].as_f64(), Some(30.0));
    assert_ne!(stored["submittedAt"], "1999-01-01T00:00:00.000Z");
    assert!(stored.get("fecha").is_none());
}
