//! Starter data for a fresh workspace.

use crate::document::Document;
use crate::model::{
    codes, create_builtin_classroom_type, create_class, create_study_program, create_subject,
    create_teacher, Class, Classroom, ClassroomId, ClassroomType, ClassroomTypeTag, StudyProgram,
    Subject, Teacher,
};

pub fn default_document() -> Document {
    Document {
        classes: default_classes(),
        teachers: default_teachers(),
        subjects: default_subjects(),
        classrooms: default_classrooms(),
        classroom_types: default_classroom_types(),
        study_programs: default_study_programs(),
        ..Document::default()
    }
}

pub fn default_classroom_types() -> Vec<ClassroomType> {
    vec![
        create_builtin_classroom_type(
            "standard",
            "Regular classroom for theory lessons.",
            "#3b82f6",
            "🏫",
        ),
        create_builtin_classroom_type(
            "computer",
            "Classroom equipped with computers for IT lessons.",
            "#10b981",
            "💻",
        ),
        create_builtin_classroom_type("lab", "Laboratory for practical work.", "#f59e0b", "🔬"),
        create_builtin_classroom_type("gym", "Gym for physical education.", "#ef4444", "🏋️"),
        create_builtin_classroom_type(
            "auditorium",
            "Large hall for assemblies, lectures and presentations.",
            "#8b5cf6",
            "🎭",
        ),
    ]
}

fn room(name: &str, capacity: u32, kind: &str) -> Classroom {
    Classroom {
        id: ClassroomId::generate(),
        name: name.to_string(),
        capacity,
        kind: ClassroomTypeTag::from(kind),
    }
}

pub fn default_classrooms() -> Vec<Classroom> {
    vec![
        room("Room 101", 30, "standard"),
        room("Room 102", 30, "standard"),
        room("Room 103", 30, "standard"),
        room("Computer Lab A", 20, "computer"),
        room("Computer Lab B", 20, "computer"),
        room("Chemistry Lab", 15, "lab"),
        room("Physics Lab", 15, "lab"),
        room("Gym", 40, "gym"),
        room("Auditorium", 100, "auditorium"),
    ]
}

pub fn default_subjects() -> Vec<Subject> {
    let tags = |t: &[&str]| -> Vec<ClassroomTypeTag> {
        t.iter().map(|s| ClassroomTypeTag::from(*s)).collect()
    };
    vec![
        create_subject("Mathematics", "MAT", tags(&["standard"]), 1),
        create_subject("Czech Language", "CJ", tags(&["standard"]), 1),
        create_subject("English Language", "AJ", tags(&["standard"]), 1),
        create_subject("Physics", "FYZ", tags(&["standard", "lab"]), 1),
        create_subject("Chemistry", "CHE", tags(&["standard", "lab"]), 1),
        create_subject("Biology", "BIO", tags(&["standard", "lab"]), 1),
        create_subject("History", "DEJ", tags(&["standard"]), 1),
        create_subject("Geography", "ZEM", tags(&["standard"]), 1),
        create_subject("Computer Science", "INF", tags(&["computer"]), 1),
        create_subject("Operating Systems", "OS", tags(&["computer"]), 2),
        create_subject("Databases", "DB", tags(&["computer"]), 2),
        create_subject("Programming", "PROG", tags(&["computer"]), 2),
        create_subject("Physical Education", "TV", tags(&["gym"]), 1),
        create_subject("Music", "HV", tags(&["standard"]), 1),
        create_subject("Art", "VV", tags(&["standard"]), 1),
    ]
}

pub fn default_teachers() -> Vec<Teacher> {
    vec![
        create_teacher("Jan Novák", "jan.novak@skola.cz", codes(["MAT", "FYZ"])),
        create_teacher("Marie Svobodová", "marie.svobodova@skola.cz", codes(["CJ", "DEJ"])),
        create_teacher("Petr Dvořák", "petr.dvorak@skola.cz", codes(["AJ"])),
        create_teacher(
            "Anna Kratochvílová",
            "anna.kratochvilova@skola.cz",
            codes(["CHE", "BIO"]),
        ),
        create_teacher(
            "Tomáš Procházka",
            "tomas.prochazka@skola.cz",
            codes(["INF", "OS", "DB", "PROG"]),
        ),
        create_teacher("Jana Malá", "jana.mala@skola.cz", codes(["TV"])),
        create_teacher("Pavel Velký", "pavel.velky@skola.cz", codes(["ZEM", "HV", "VV"])),
    ]
}

pub fn default_classes() -> Vec<Class> {
    let first_year = [
        "MAT", "CJ", "AJ", "FYZ", "CHE", "BIO", "DEJ", "ZEM", "INF", "TV", "HV", "VV",
    ];
    let second_year = [
        "MAT", "CJ", "AJ", "FYZ", "CHE", "BIO", "DEJ", "ZEM", "INF", "OS", "DB", "TV", "HV", "VV",
    ];
    vec![
        create_class("1.A", 1, codes(first_year)),
        create_class("1.B", 1, codes(first_year)),
        create_class("2.A", 2, codes(second_year)),
        create_class("2.B", 2, codes(second_year)),
    ]
}

pub fn default_study_programs() -> Vec<StudyProgram> {
    (1..=4)
        .map(|years| create_study_program("IT", years, codes(["MAT", "CJ"])))
        .collect()
}
