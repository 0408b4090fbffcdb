mod test_support;

use serde_json::json;
use test_support::{approx, error_code, str_field, Session};

#[test]
fn upserting_the_same_key_twice_keeps_one_record_with_latest_scores() {
    let mut s = Session::open("marksheet-marks-upsert");
    let class_id = s.create_class("S1 East", "O-Level", 2024);
    let maths = s.create_subject("MTC", "Mathematics", "O-Level");
    let amy = s.create_student(&class_id, "N001", "Amy Achieng");

    let first = s.put_marks(&amy, &maths, json!(80), json!(70), json!(null));
    assert_eq!(first["isComplete"], json!(false));
    assert!(first["finalMark"].is_null());
    assert_eq!(first["grade"], json!("-"));
    assert_eq!(first["completionPercentage"], json!(66));

    let second = s.put_marks(&amy, &maths, json!(80), json!(70), json!(60));
    assert_eq!(str_field(&second, "markId"), str_field(&first, "markId"));
    assert_eq!(second["isComplete"], json!(true));
    assert!(approx(&second["finalMark"], 64.0));
    assert_eq!(second["grade"], json!("C"));
    assert_eq!(second["completionPercentage"], json!(100));

    let sheet = s.ok(
        "marks.entrySheet",
        json!({ "classId": class_id, "subjectId": maths, "academicYear": 2024, "term": 1 }),
    );
    let rows = sheet["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["hasExistingRecord"], json!(true));
    assert!(approx(&rows[0]["eot"], 60.0));
    assert!(approx(&rows[0]["finalMark"], 64.0));

    // Another term is a separate record.
    let other = s.ok(
        "marks.upsert",
        json!({
            "studentId": amy, "subjectId": maths, "academicYear": 2024, "term": 2,
            "bot": 10, "mot": 10, "eot": 10
        }),
    );
    assert_ne!(str_field(&other, "markId"), str_field(&first, "markId"));
}

#[test]
fn scores_are_validated_before_anything_is_written() {
    let mut s = Session::open("marksheet-marks-validation");
    let class_id = s.create_class("S2 West", "O-Level", 2024);
    let maths = s.create_subject("MTC", "Mathematics", "O-Level");
    let ben = s.create_student(&class_id, "N002", "Ben Okello");

    for bad in [json!(100.01), json!(-1), json!("ten"), json!(true)] {
        let resp = s.call(
            "marks.upsert",
            json!({
                "studentId": ben, "subjectId": maths, "academicYear": 2024, "term": 1,
                "bot": bad, "mot": 50, "eot": 50
            }),
        );
        assert_eq!(error_code(&resp), Some("bad_params"), "{}", resp);
    }

    let unknown = s.call(
        "marks.upsert",
        json!({ "studentId": "ghost", "subjectId": maths, "academicYear": 2024, "term": 1 }),
    );
    assert_eq!(error_code(&unknown), Some("not_found"));

    // Numeric strings are accepted and kept exact.
    let ok = s.put_marks(&ben, &maths, json!("0.1"), json!("0.1"), json!("0.1"));
    assert!(approx(&ok["finalMark"], 0.1));

    let sheet = s.ok(
        "marks.entrySheet",
        json!({ "classId": class_id, "subjectId": maths, "academicYear": 2024, "term": 1 }),
    );
    assert_eq!(sheet["rows"].as_array().map(|r| r.len()), Some(1));
}

#[test]
fn class_entry_skips_blank_new_rows_and_overwrites_existing_ones() {
    let mut s = Session::open("marksheet-marks-class-entry");
    let class_id = s.create_class("S3 North", "O-Level", 2024);
    let other_class = s.create_class("S3 South", "O-Level", 2024);
    let eng = s.create_subject("ENG", "English", "O-Level");
    let amy = s.create_student(&class_id, "N010", "Amy");
    let ben = s.create_student(&class_id, "N011", "Ben");
    let cal = s.create_student(&class_id, "N012", "Cal");
    let stranger = s.create_student(&other_class, "N013", "Dee");

    // Cal already has a record; the entry below clears it.
    s.put_marks(&cal, &eng, json!(50), json!(50), json!(50));

    let saved = s.ok(
        "marks.saveClassEntry",
        json!({
            "classId": class_id, "subjectId": eng, "academicYear": 2024, "term": 1,
            "entries": [
                { "studentId": amy, "bot": 90, "mot": 80, "eot": 70 },
                { "studentId": ben, "bot": null, "mot": null, "eot": null },
                { "studentId": cal, "bot": null, "mot": 40, "eot": null }
            ]
        }),
    );
    assert_eq!(saved["saved"], json!(2));
    assert_eq!(saved["skipped"], json!(1));

    let sheet = s.ok(
        "marks.entrySheet",
        json!({ "classId": class_id, "subjectId": eng, "academicYear": 2024, "term": 1 }),
    );
    let rows = sheet["rows"].as_array().expect("rows");
    let names: Vec<&str> = rows
        .iter()
        .map(|r| r["student"]["fullName"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["Amy", "Ben", "Cal"]);
    // 9 + 16 + 49
    assert!(approx(&rows[0]["finalMark"], 74.0));
    assert_eq!(rows[0]["grade"], json!("B"));
    assert_eq!(rows[1]["hasExistingRecord"], json!(false));
    assert_eq!(rows[2]["hasExistingRecord"], json!(true));
    assert!(rows[2]["bot"].is_null());
    assert_eq!(rows[2]["completionPercentage"], json!(33));
    assert!(rows[2]["finalMark"].is_null());

    let refused = s.call(
        "marks.saveClassEntry",
        json!({
            "classId": class_id, "subjectId": eng, "academicYear": 2024, "term": 1,
            "entries": [ { "studentId": stranger, "bot": 1, "mot": 1, "eot": 1 } ]
        }),
    );
    assert_eq!(error_code(&refused), Some("bad_params"));
}
