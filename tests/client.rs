mod common;

use std::sync::Arc;

use common::{route, StubServer};
use remote_health::credentials::{CredentialStore, MemoryCredentialStore};
use remote_health::dashboard::{load_clinical_overview, load_patient_dashboard, DashboardView};
use remote_health::guard::{RouteDecision, RouteGuard};
use remote_health::models::{MessageId, NewPatient, PatientUpdate, User, UserRole};
use remote_health::session::AuthSession;
use remote_health::vitals::Vital;
use remote_health::ApiError;
use serde_json::json;

fn patient_user() -> User {
    User {
        id: 9,
        email: "pat@example.org".into(),
        role: UserRole::Patient,
        first_name: Some("Pat".into()),
        last_name: Some("Doe".into()),
        doctor_code: None,
    }
}

fn user_json(role: &str) -> serde_json::Value {
    json!({"id": 9, "email": "pat@example.org", "role": role, "first_name": "Pat", "last_name": "Doe"})
}

#[tokio::test]
async fn bearer_token_is_attached() {
    let server = StubServer::start(vec![route("GET", "/alerts", 200, json!([]))]).await;
    let (client, _store) = server.client_with_token("tok-123");

    let alerts = client.alerts().list().await.unwrap();
    assert!(alerts.is_empty());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn no_token_no_header() {
    let server = StubServer::start(vec![route("GET", "/disease-thresholds", 200, json!([]))]).await;
    let client = server.client(Arc::new(MemoryCredentialStore::new()));
    assert!(client.thresholds().list().await.is_empty());
    assert_eq!(server.requests()[0].authorization, None);
}

#[tokio::test]
async fn login_stores_token_and_names() {
    let server = StubServer::start(vec![route(
        "POST",
        "/auth/login",
        200,
        json!({"token": {"access_token": "jwt-abc", "token_type": "bearer"}, "user": user_json("PATIENT")}),
    )])
    .await;
    let store = Arc::new(MemoryCredentialStore::new());
    let mut session = AuthSession::new(server.client(store.clone()));

    let user = session.login("pat@example.org", "s3cret").await.unwrap();
    assert_eq!(user.role, UserRole::Patient);
    assert!(session.is_authenticated());
    assert!(!session.state().loading);

    let creds = store.load().unwrap();
    assert_eq!(creds.token.as_deref(), Some("jwt-abc"));
    assert_eq!(creds.first_name.as_deref(), Some("Pat"));

    let req = &server.requests()[0];
    assert!(req.content_type.as_deref().unwrap_or_default().starts_with("application/x-www-form-urlencoded"));
    assert!(req.body.contains("username=pat%40example.org"));
    assert!(req.body.contains("password=s3cret"));
}

#[tokio::test]
async fn failed_login_leaves_session_logged_out() {
    let server = StubServer::start(vec![route(
        "POST",
        "/auth/login",
        401,
        json!({"detail": "Incorrect email or password"}),
    )])
    .await;
    let mut session = AuthSession::new(server.client(Arc::new(MemoryCredentialStore::new())));
    let err = session.login("x@y.z", "bad").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn initialize_restores_user_from_token() {
    let server = StubServer::start(vec![route("GET", "/auth/me", 200, user_json("DOCTOR"))]).await;
    let (client, _store) = server.client_with_token("still-valid");
    let mut session = AuthSession::new(client);
    assert_eq!(RouteGuard::doctor_only().check(session.state()), RouteDecision::Pending);

    session.initialize().await;
    assert_eq!(session.user().map(|u| u.role), Some(UserRole::Doctor));
    assert_eq!(RouteGuard::doctor_only().check(session.state()), RouteDecision::Allow);
    assert_eq!(RouteGuard::patient_only().check(session.state()), RouteDecision::Redirect("/"));
}

#[tokio::test]
async fn rejected_token_is_cleared_on_initialize() {
    let server = StubServer::start(vec![route("GET", "/auth/me", 401, json!({"detail": "Could not validate credentials"}))]).await;
    let (client, store) = server.client_with_token("expired");
    let mut session = AuthSession::new(client);

    session.initialize().await;
    assert!(!session.is_authenticated());
    assert!(!session.state().loading);
    assert_eq!(store.token(), None);
    assert_eq!(RouteGuard::authenticated().check(session.state()), RouteDecision::Redirect("/login"));
}

#[tokio::test]
async fn initialize_without_token_skips_the_backend() {
    let server = StubServer::start(vec![]).await;
    let mut session = AuthSession::new(server.client(Arc::new(MemoryCredentialStore::new())));
    session.initialize().await;
    assert!(!session.is_authenticated());
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn missing_profile_is_none_for_404_and_422() {
    for status in [404u16, 422] {
        let server = StubServer::start(vec![route("GET", "/patient-records/me", status, json!({"detail": "Patient profile not found"}))]).await;
        let (client, _) = server.client_with_token("t");
        assert_eq!(client.patients().current_profile().await.unwrap(), None);
    }
}

#[tokio::test]
async fn profile_server_error_is_an_error() {
    let server = StubServer::start(vec![route("GET", "/patient-records/me", 500, json!({"detail": "boom"}))]).await;
    let (client, _) = server.client_with_token("t");
    match client.patients().current_profile().await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn dashboard_shows_profile_not_found() {
    let server = StubServer::start(vec![route("GET", "/patient-records/me", 404, json!({"detail": "Not found"}))]).await;
    let (client, _) = server.client_with_token("t");
    assert_eq!(load_patient_dashboard(&client, &patient_user()).await, DashboardView::ProfileNotFound);
}

#[tokio::test]
async fn dashboard_for_non_patient() {
    let server = StubServer::start(vec![]).await;
    let (client, _) = server.client_with_token("t");
    let mut doctor = patient_user();
    doctor.role = UserRole::Doctor;
    assert_eq!(load_patient_dashboard(&client, &doctor).await, DashboardView::NotPatient);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn dashboard_loads_vitals_with_fallback_path_and_flags_latest() {
    let server = StubServer::start(vec![
        route(
            "GET",
            "/patient-records/me",
            200,
            json!({"id": 3, "user_id": 9, "email": "pat@example.org", "role": "PATIENT", "full_name": "Pat Doe"}),
        ),
        route("GET", "/patient-records/9/vitals/", 500, json!({"detail": "Internal Server Error"})),
        route(
            "GET",
            "/patient-records/9/vitals",
            200,
            json!([
                {"heartRate": 72, "temperature": 36.6, "oxygenSaturation": 98, "systolic": 120, "diastolic": 80, "timestamp": "2024-05-01T10:00:00"},
                {"heartRate": 112, "temperature": 37.0, "oxygenSaturation": 93, "systolic": 150, "diastolic": 85, "timestamp": "2024-05-01T11:00:00"}
            ]),
        ),
        route(
            "GET",
            "/alerts/patient/9",
            200,
            json!([{"id": 1, "patient_id": 9, "severity": "red", "message": "HR high", "created_at": "2024-05-01T11:00:00", "is_resolved": false}]),
        ),
    ])
    .await;
    let (client, _) = server.client_with_token("t");

    let dash = match load_patient_dashboard(&client, &patient_user()).await {
        DashboardView::Ready(dash) => dash,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(dash.profile.display_name(), "Pat Doe");
    assert_eq!(dash.vitals.len(), 2);
    assert_eq!(dash.latest.as_ref().and_then(|v| v.heart_rate), Some(112.0));
    assert!(dash.assessment.is_flagged(Vital::HeartRate));
    assert!(dash.assessment.is_flagged(Vital::BloodPressure));
    assert!(dash.assessment.is_flagged(Vital::OxygenSaturation));
    assert_eq!(dash.active_alerts().count(), 1);
    assert_eq!(server.hits("GET", "/patient-records/9/vitals/"), 1);
}

#[tokio::test]
async fn vitals_fail_when_every_path_fails() {
    let server = StubServer::start(vec![]).await;
    let (client, _) = server.client_with_token("t");
    let err = client.patients().vitals(4).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
    assert_eq!(server.hits("GET", "/patients/4/vitals"), 1);
}

#[tokio::test]
async fn thresholds_fall_back_to_reference_table() {
    let server = StubServer::start(vec![route("GET", "/disease-thresholds", 500, json!({"detail": "db down"}))]).await;
    let (client, _) = server.client_with_token("t");
    let thresholds = client.thresholds().list().await;
    assert_eq!(thresholds.len(), 7);
    assert_eq!(thresholds[1].disease, "Hypertension");

    let bradycardia = client.thresholds().get(7).await.unwrap();
    assert_eq!(bradycardia.heart_rate_max, 59.0);
    assert!(client.thresholds().get(99).await.is_none());
}

#[tokio::test]
async fn active_alerts_are_filtered_client_side() {
    let server = StubServer::start(vec![route(
        "GET",
        "/alerts?status=ACTIVE",
        200,
        json!([
            {"id": 1, "patientId": 2, "type": "WARNING", "message": "a", "timestamp": "t", "status": "ACTIVE"},
            {"id": 2, "patientId": 2, "type": "MILD", "message": "b", "timestamp": "t", "status": "RESOLVED"}
        ]),
    )])
    .await;
    let (client, _) = server.client_with_token("t");
    let active = client.alerts().active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, 1);
}

#[tokio::test]
async fn forbidden_carries_detail() {
    let server = StubServer::start(vec![route("GET", "/alerts", 403, json!({"detail": "Not authorized to access all system alerts"}))]).await;
    let (client, store) = server.client_with_token("t");
    match client.alerts().list().await {
        Err(ApiError::Forbidden(message)) => assert!(message.contains("Not authorized")),
        other => panic!("unexpected {:?}", other),
    }
    // only a 401 drops the token
    assert_eq!(store.token().as_deref(), Some("t"));
}

fn profile_json() -> serde_json::Value {
    json!({"id": 3, "user_id": 9, "email": "pat@example.org", "role": "PATIENT", "full_name": "Pat Doe"})
}

fn body_of(server: &StubServer, method: &str, path: &str) -> serde_json::Value {
    let req = server
        .requests()
        .into_iter()
        .find(|r| r.method == method && r.path == path)
        .unwrap_or_else(|| panic!("no {} {}", method, path));
    serde_json::from_str(&req.body).unwrap()
}

#[tokio::test]
async fn dashboard_judges_newest_reading_when_served_newest_first() {
    let server = StubServer::start(vec![
        route("GET", "/patient-records/me", 200, profile_json()),
        route(
            "GET",
            "/patient-records/9/vitals/",
            200,
            json!([
                {"heartRate": 130, "oxygenSaturation": 90, "timestamp": "2024-05-02T10:00:00"},
                {"heartRate": 72, "oxygenSaturation": 98, "timestamp": "2024-05-01T10:00:00"}
            ]),
        ),
        route("GET", "/alerts/patient/9", 200, json!([])),
    ])
    .await;
    let (client, _) = server.client_with_token("t");

    let dash = match load_patient_dashboard(&client, &patient_user()).await {
        DashboardView::Ready(dash) => dash,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(dash.latest.as_ref().and_then(|v| v.heart_rate), Some(130.0));
    assert!(dash.assessment.is_flagged(Vital::HeartRate));
    assert!(dash.assessment.is_flagged(Vital::OxygenSaturation));
}

#[tokio::test]
async fn notes_are_listed_and_added() {
    let note = json!({"id": 4, "patient_id": 5, "doctor_id": 1, "note": "Review BP", "created_at": "2024-05-01T10:00:00"});
    let server = StubServer::start(vec![
        route("GET", "/notes/5", 200, json!([note.clone()])),
        route("POST", "/notes/add", 201, note),
    ])
    .await;
    let (client, _) = server.client_with_token("t");

    let notes = client.notes().for_patient(5).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "Review BP");

    let added = client.notes().add(5, "Review BP").await.unwrap();
    assert_eq!(added.id, 4);
    assert_eq!(body_of(&server, "POST", "/notes/add"), json!({"patient_id": 5, "note": "Review BP"}));
}

#[tokio::test]
async fn patient_records_create_update_delete() {
    let server = StubServer::start(vec![
        route("POST", "/patient-records", 201, profile_json()),
        route("PUT", "/patient-records/3", 200, profile_json()),
        route("DELETE", "/patient-records/3", 204, json!(null)),
    ])
    .await;
    let (client, _) = server.client_with_token("t");

    let created = client
        .patients()
        .create(&NewPatient {
            full_name: "Pat Doe".into(),
            email: "pat@example.org".into(),
            chronic_diseases: Some("Diabetes, Asthma".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.id, Some(3));
    // unset optional fields are left out of the payload
    assert_eq!(
        body_of(&server, "POST", "/patient-records"),
        json!({"full_name": "Pat Doe", "email": "pat@example.org", "chronic_diseases": "Diabetes, Asthma"})
    );

    client
        .patients()
        .update(
            3,
            &PatientUpdate {
                phone_number: Some("555-0101".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(body_of(&server, "PUT", "/patient-records/3"), json!({"phone_number": "555-0101"}));

    client.patients().delete(3).await.unwrap();
    assert_eq!(server.hits("DELETE", "/patient-records/3"), 1);
}

#[tokio::test]
async fn doctor_patients_stats_and_pairing() {
    let server = StubServer::start(vec![
        route("GET", "/doctors/me/patients", 200, json!([profile_json()])),
        route("GET", "/patient-records/vital-signs/stats", 200, json!([{"month": "2024-05", "count": 12}])),
        route("POST", "/pair/pair-with-doctor", 200, json!({"message": "Paired"})),
    ])
    .await;
    let (client, _) = server.client_with_token("t");

    let patients = client.patients().doctor_patients().await.unwrap();
    assert_eq!(patients[0].display_name(), "Pat Doe");

    let stats = client.patients().vital_stats().await.unwrap();
    assert_eq!((stats[0].month.as_str(), stats[0].count), ("2024-05", 12));

    let paired = client.patients().pair_with_doctor("DOC-1").await.unwrap();
    assert_eq!(paired["message"], "Paired");
    assert_eq!(body_of(&server, "POST", "/pair/pair-with-doctor"), json!({"doctor_code": "DOC-1"}));
}

#[tokio::test]
async fn mark_read_only_reaches_the_server_for_server_ids() {
    let server = StubServer::start(vec![route("PUT", "/messaging/messages/10/read", 200, json!({}))]).await;
    let (client, _) = server.client_with_token("t");

    client.messaging().mark_read(&MessageId::Server(10)).await.unwrap();
    assert_eq!(server.hits("PUT", "/messaging/messages/10/read"), 1);

    let err = client.messaging().mark_read(&MessageId::pending()).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn locations_list_and_per_patient() {
    let location = json!({"id": 1, "patient_id": 2, "latitude": 38.72, "longitude": -9.14, "timestamp": "2024-05-01T10:00:00", "city": "Lisbon"});
    let server = StubServer::start(vec![
        route("GET", "/locations", 200, json!([location.clone()])),
        route("GET", "/patients/2/location", 200, location),
    ])
    .await;
    let (client, _) = server.client_with_token("t");

    assert_eq!(client.locations().list().await.unwrap().len(), 1);
    let one = client.locations().for_patient(2).await.unwrap();
    assert_eq!(one.patient_id, 2);
    assert_eq!(one.city.as_deref(), Some("Lisbon"));
}

#[tokio::test]
async fn disease_name_is_encoded_as_one_path_segment() {
    let server = StubServer::start(vec![route(
        "GET",
        "/disease-thresholds/disease/Type%202%2FDiabetes",
        200,
        json!([]),
    )])
    .await;
    let (client, _) = server.client_with_token("t");

    let thresholds = client.thresholds().for_disease("Type 2/Diabetes").await.unwrap();
    assert!(thresholds.is_empty());
    let req = &server.requests()[0];
    assert_eq!(req.path, "/disease-thresholds/disease/Type%202%2FDiabetes");
    assert_eq!(req.authorization.as_deref(), Some("Bearer t"));
}

#[tokio::test]
async fn clinical_overview_prefers_server_aggregates() {
    let server = StubServer::start(vec![route(
        "GET",
        "/patient-records/clinical-overview/stats",
        200,
        json!({
            "total_patient_count": 240,
            "active_alerts_by_severity": {"red": 2, "yellow": 5, "blue": 1},
            "chronic_disease_distribution": {"asthma": 9}
        }),
    )])
    .await;
    let (client, _) = server.client_with_token("t");

    let overview = load_clinical_overview(&client).await.unwrap();
    assert_eq!((overview.patients, overview.active_alerts, overview.critical_alerts), (240, 8, 2));
    assert_eq!(server.hits("GET", "/patient-records"), 0);
}

#[tokio::test]
async fn clinical_overview_counts_records_without_aggregates() {
    let server = StubServer::start(vec![
        route(
            "GET",
            "/patient-records",
            200,
            json!([{"user_id": 9, "email": "a@example.org", "chronic_diseases": "Asthma"}]),
        ),
        route(
            "GET",
            "/alerts",
            200,
            json!([{"id": 1, "patient_id": 9, "severity": "red", "message": "m", "created_at": "t", "is_resolved": false}]),
        ),
    ])
    .await;
    let (client, _) = server.client_with_token("t");

    let overview = load_clinical_overview(&client).await.unwrap();
    assert_eq!((overview.patients, overview.active_alerts, overview.critical_alerts), (1, 1, 1));
    assert_eq!(overview.chronic_diseases.get("asthma"), Some(&1));
}
