//! Conversions between handler requests, entities and response resources.

use crate::model::{
    City, EntityId, Gender, Person, PhoneNumber, PhoneNumberType, Relationship, RelationshipType,
};
use crate::service::person_commands::{CreatePerson, NewPhoneNumber, NewRelatedIndividual, PhoneNumberChange, UpdatePerson};
use crate::service::relationship_commands::AddRelationship;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonResource {
    pub id: EntityId,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub personal_number: String,
    pub date_of_birth: NaiveDate,
    pub city_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<CityResource>,
    pub phone_numbers: Vec<PhoneNumberResource>,
    pub image: Option<String>,
    pub relationships: Vec<RelationshipResource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberResource {
    pub id: EntityId,
    pub number_type: PhoneNumberType,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityResource {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipResource {
    pub id: EntityId,
    pub relationship_type: RelationshipType,
    pub person_id: EntityId,
    pub related_person_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_person: Option<Box<PersonResource>>,
}

fn timestamp(epoch_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms).unwrap_or_default()
}

impl From<Person> for PersonResource {
    fn from(person: Person) -> Self {
        Self {
            id: person.id,
            first_name: person.name,
            last_name: person.surname,
            gender: person.gender,
            personal_number: person.personal_number,
            date_of_birth: person.date_of_birth,
            city_id: person.city_id,
            city: person.city.map(CityResource::from),
            phone_numbers: person
                .phone_numbers
                .into_iter()
                .map(PhoneNumberResource::from)
                .collect(),
            image: person.image,
            relationships: person
                .relationships
                .into_iter()
                .map(RelationshipResource::from)
                .collect(),
            created_at: timestamp(person.audit.created_at),
            updated_at: timestamp(person.audit.updated_at),
        }
    }
}

impl From<PhoneNumber> for PhoneNumberResource {
    fn from(phone: PhoneNumber) -> Self {
        Self {
            id: phone.id,
            number_type: phone.number_type,
            number: phone.number,
        }
    }
}

impl From<City> for CityResource {
    fn from(city: City) -> Self {
        Self {
            id: city.id,
            name: city.name,
        }
    }
}

impl From<Relationship> for RelationshipResource {
    fn from(relationship: Relationship) -> Self {
        Self {
            id: relationship.id,
            relationship_type: relationship.relationship_type,
            person_id: relationship.person_id,
            related_person_id: relationship.related_person_id,
            related_person: relationship
                .related_person
                .map(|person| Box::new(PersonResource::from(*person))),
        }
    }
}

impl From<&CreatePerson> for Person {
    fn from(request: &CreatePerson) -> Self {
        Person::new(
            request.name.clone(),
            request.surname.clone(),
            request.gender,
            request.personal_number.clone(),
            request.date_of_birth,
            request.city_id,
        )
    }
}

impl NewPhoneNumber {
    pub fn to_entity(&self, person_id: EntityId) -> PhoneNumber {
        PhoneNumber::new(self.number_type, self.number.clone(), person_id)
    }
}

impl NewRelatedIndividual {
    pub fn to_entity(&self, person_id: EntityId) -> Relationship {
        Relationship::new(self.type_of_connection, person_id, self.related_person_id)
    }
}

impl AddRelationship {
    pub fn to_entity(&self) -> Relationship {
        Relationship::new(self.relationship_type, self.person_id, self.related_person_id)
    }
}

impl UpdatePerson {
    /// Overwrites the scalar fields of `person`; identity, image and
    /// relations are left alone.
    pub fn apply_to(&self, person: &mut Person) {
        person.name.clone_from(&self.name);
        person.surname.clone_from(&self.surname);
        person.gender = self.gender;
        person.personal_number.clone_from(&self.personal_number);
        person.date_of_birth = self.date_of_birth;
        person.city_id = self.city_id;
    }
}

impl PhoneNumberChange {
    pub fn apply_to(&self, phone: &mut PhoneNumber) {
        phone.number_type = self.number_type;
        phone.number.clone_from(&self.number);
    }

    pub fn to_entity(&self, person_id: EntityId) -> PhoneNumber {
        PhoneNumber::new(self.number_type, self.number.clone(), person_id)
    }
}

#[cfg(test)]
mod tests {
    use super::PersonResource;
    use crate::model::{City, Gender, Person, PhoneNumber, PhoneNumberType};
    use chrono::NaiveDate;

    #[test]
    fn person_resource_serializes_camel_case() {
        let mut person = Person::new(
            "Alex",
            "Johnson",
            Gender::Male,
            "12345678901",
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            1,
        );
        person.id = 5;
        person.audit.created_at = 1_711_639_342_000;
        person.audit.updated_at = 1_711_639_342_000;
        let mut city = City::new("Tbilisi");
        city.id = 1;
        person.city = Some(city);
        person
            .phone_numbers
            .push(PhoneNumber::new(PhoneNumberType::Mobile, "5551234", 5));

        let json = serde_json::to_value(PersonResource::from(person)).unwrap();

        assert_eq!(json["firstName"], "Alex");
        assert_eq!(json["lastName"], "Johnson");
        assert_eq!(json["gender"], "male");
        assert_eq!(json["dateOfBirth"], "1990-01-01");
        assert_eq!(json["city"]["name"], "Tbilisi");
        assert_eq!(json["phoneNumbers"][0]["numberType"], "mobile");
        assert_eq!(json["createdAt"], "2024-03-28T15:22:22Z");
    }
}
