//! Sample voters used to repopulate a store after recovery.

use voterlink_types::{Address, Demographics, Gender, NewVoter, RegistrationStatus};

fn address(constituency: &str, ward: &str, district: &str, street: &str) -> Address {
    Address {
        street: Some(street.to_string()),
        ward: ward.to_string(),
        district: district.to_string(),
        constituency: constituency.to_string(),
        pincode: Some("560001".to_string()),
    }
}

/// Sample voters for a constituency. Voter ids are unique within the set.
pub fn sample_voters(constituency: &str) -> Vec<NewVoter> {
    let mut john = NewVoter::new(
        "VTR001",
        "John",
        "Doe",
        address(constituency, "Ward 1", "Central", "12 MG Road"),
        RegistrationStatus::Registered,
    );
    john.phone_number = Some("+91 98450 00001".to_string());
    john.demographics = Some(Demographics {
        age: Some(45),
        gender: Some(Gender::Male),
        occupation: Some("Shopkeeper".to_string()),
        education: Some("Secondary".to_string()),
    });

    let mut jane = NewVoter::new(
        "VTR002",
        "Jane",
        "Smith",
        address(constituency, "Ward 2", "Central", "4 Church Street"),
        RegistrationStatus::Verified,
    );
    jane.email = Some("jane.smith@example.org".to_string());
    jane.demographics = Some(Demographics {
        age: Some(32),
        gender: Some(Gender::Female),
        occupation: Some("Teacher".to_string()),
        education: Some("Graduate".to_string()),
    });

    let mut priya = NewVoter::new(
        "VTR003",
        "Priya",
        "Sharma",
        address(constituency, "Ward 1", "East", "88 Lake View"),
        RegistrationStatus::Pending,
    );
    priya.phone_number = Some("+91 98450 00003".to_string());

    let ravi = NewVoter::new(
        "VTR004",
        "Ravi",
        "Kumar",
        address(constituency, "Ward 3", "East", "7 Temple Lane"),
        RegistrationStatus::Inactive,
    );

    vec![john, jane, priya, ravi]
}
