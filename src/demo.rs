//! Synthetic marketplace review generator.
//!
//! Fallback data for when the marketplace blocks scraping, so demos and the
//! frontend keep working. Roughly a 4-star product: ~65% positive, ~25%
//! negative, ~10% neutral.

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::RawReview;

struct Template {
    title: &'static str,
    text: &'static str,
    rating: f32,
}

const POSITIVE: &[Template] = &[
    Template {
        title: "Love these boots!",
        text: "These are exactly what I expected. The leather quality is exceptional and they're built to last. Yes, there's a break-in period, but it's worth it. After a few weeks, they're the most comfortable boots I own.",
        rating: 5.0,
    },
    Template {
        title: "Quality craftsmanship",
        text: "The stitching and leather quality are top-notch. These boots feel substantial and well-made. I've had mine for 6 months and they still look brand new. Definitely worth the investment.",
        rating: 5.0,
    },
    Template {
        title: "Great boots once broken in",
        text: "The break-in period was about 2 weeks of occasional wear. Now they're super comfortable and I wear them almost every day. The air-cushioned sole provides great support.",
        rating: 4.0,
    },
    Template {
        title: "Worth every penny",
        text: "Yes, they're expensive, but the quality justifies the price. These are boots you'll have for decades. The welted construction means they can be resoled multiple times.",
        rating: 5.0,
    },
    Template {
        title: "Iconic and durable",
        text: "These boots are an investment piece. The smooth leather can be polished to look brand new even after years of wear. I love the classic design and how versatile they are.",
        rating: 5.0,
    },
    Template {
        title: "Very comfortable after breaking in",
        text: "Took about 3 weeks to fully break in, but now they're incredibly comfortable. The cushioned insole provides great arch support. I can walk all day in these without any issues.",
        rating: 4.0,
    },
];

const NEGATIVE: &[Template] = &[
    Template {
        title: "Sizing runs large",
        text: "I ordered my usual size and they're way too big. I have to wear thick socks to make them fit. Wish I had sized down. Also, the break-in period is brutal - my heels were covered in blisters.",
        rating: 2.0,
    },
    Template {
        title: "Extremely stiff",
        text: "After 3 weeks of wearing them, they're still incredibly stiff and uncomfortable. The leather hasn't softened at all. Starting to wonder if they'll ever break in properly.",
        rating: 2.0,
    },
    Template {
        title: "Overpriced",
        text: "For the price, I expected better quality. The leather feels cheap and plasticky. I've had $50 boots that felt more premium than these. Very disappointed.",
        rating: 1.0,
    },
    Template {
        title: "Not worth the hype",
        text: "Everyone raves about these but I don't see what the big deal is. They're heavy, stiff, and take forever to break in. There are much more comfortable boots out there.",
        rating: 2.0,
    },
];

const NEUTRAL: &[Template] = &[
    Template {
        title: "Decent boots",
        text: "They do the job. The sizing chart was accurate for me and shipping was quick. Time will tell how the leather holds up through winter.",
        rating: 3.0,
    },
    Template {
        title: "As described",
        text: "Arrived on time and matched the listing photos. Still in the break-in phase so I can't speak to long-term comfort yet.",
        rating: 3.0,
    },
];

const AUTHORS: &[&str] = &[
    "Alex M.", "Jordan P.", "Sam T.", "Casey R.", "Morgan L.", "Riley K.",
    "Jamie W.", "Taylor S.", "Avery B.", "Quinn D.", "Drew H.", "Parker N.",
];

/// Generate `count` plausible marketplace reviews for a product.
pub fn generate_reviews(product_name: &str, count: usize) -> Vec<RawReview> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();
    let mut reviews = Vec::with_capacity(count);

    for _ in 0..count {
        let roll: f64 = rng.gen();
        let template = if roll < 0.65 {
            POSITIVE.choose(&mut rng)
        } else if roll < 0.90 {
            NEGATIVE.choose(&mut rng)
        } else {
            NEUTRAL.choose(&mut rng)
        };
        let Some(template) = template else { continue };

        let days_ago = rng.gen_range(1..180);
        let date = (now - Duration::days(days_ago)).format("%Y-%m-%d").to_string();

        let mut review = RawReview::new(
            AUTHORS.choose(&mut rng).copied().unwrap_or("Anonymous"),
            template.text,
            template.rating,
            date,
        );
        review.title = Some(format!("{} - {}", template.title, product_name));
        review.verified = Some(rng.gen_bool(0.8));
        reviews.push(review);
    }

    reviews
}
