//! Disease classes known to the leaf classifier and their care recommendations.

pub const UNKNOWN_DISEASE: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct DiseaseClass {
    pub id: usize,
    pub name: String,
    pub recommendations: Vec<String>,
}

impl DiseaseClass {
    fn new(id: usize, name: &str, recommendations: &[&str]) -> Self {
        DiseaseClass {
            id,
            name: name.to_string(),
            recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiseaseCatalog {
    classes: Vec<DiseaseClass>,
}

impl DiseaseCatalog {
    pub fn new(classes: Vec<DiseaseClass>) -> Self {
        DiseaseCatalog { classes }
    }

    /// The four tomato leaf classes the bundled model was trained on.
    pub fn builtin() -> Self {
        Self::new(vec![
            DiseaseClass::new(
                0,
                "Tomato Target Spot",
                &[
                    "Remove infected leaves",
                    "Avoid overhead irrigation",
                    "Apply suitable fungicide",
                    "Improve air circulation",
                    "Maintain field hygiene",
                    "Monitor crops regularly",
                ],
            ),
            DiseaseClass::new(
                1,
                "Tomato Mosaic Virus",
                &[
                    "Remove infected plants",
                    "Control insect vectors",
                    "Use resistant varieties",
                    "Avoid overcrowding",
                    "Maintain proper sanitation",
                    "Monitor nearby plants",
                ],
            ),
            DiseaseClass::new(
                2,
                "Tomato Yellow Leaf Curl Virus",
                &[
                    "Use virus-free seedlings",
                    "Control whiteflies",
                    "Remove affected plants",
                    "Apply reflective mulch",
                    "Use resistant hybrids",
                    "Ensure proper spacing",
                ],
            ),
            DiseaseClass::new(
                3,
                "Healthy",
                &[
                    "Continue regular monitoring",
                    "Maintain proper irrigation",
                    "Apply balanced fertilizers",
                    "Keep field weed-free",
                    "Follow crop rotation",
                    "Use certified seeds",
                ],
            ),
        ])
    }

    pub fn get(&self, class_id: usize) -> Option<&DiseaseClass> {
        self.classes.iter().find(|class| class.id == class_id)
    }

    pub fn disease_name(&self, class_id: usize) -> &str {
        self.get(class_id)
            .map(|class| class.name.as_str())
            .unwrap_or(UNKNOWN_DISEASE)
    }

    pub fn class_ids(&self) -> Vec<usize> {
        self.classes.iter().map(|class| class.id).collect()
    }

    pub fn classes(&self) -> &[DiseaseClass] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }
}
